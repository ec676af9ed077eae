//! Round-Robin-Multiplexer
//!
//! Pro Runde liefert jeder aktive Nutzer (aufsteigende ID) genau einen
//! gerahmten Sample. Ein Nutzer, dessen Queue zu Beginn seines Zuges leer ist,
//! verlaesst den aktiven Satz endgueltig. Paketlaengen sind daher monoton
//! nicht steigend.
//!
//! Der Slot-Zaehler laeuft einmal pro ausgegebener Runde weiter und indiziert
//! das Sync-Muster zyklisch.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tdmlink_core::{LinkConfig, LinkEreignis, UserId};

use crate::coder::SampleCoder;
use crate::error::{VoiceError, VoiceResult};
use crate::frame::{Frame, FrameCodec};
use crate::sync::SyncPattern;

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Ein Sendepaket: ein Frame pro aktivem Nutzer, aufsteigend nach ID
///
/// Traegt die Slot-Belegung (Nutzer pro Position) mit, damit die Gegenseite
/// ungleich lange Streams korrekt zuordnen kann.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Laufende Paketnummer (beginnend bei 0)
    pub index: u64,
    slots: Vec<(UserId, Frame)>,
}

impl Packet {
    pub fn neu(index: u64, slots: Vec<(UserId, Frame)>) -> Self {
        Self { index, slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nutzer in Frame-Reihenfolge
    pub fn user_ids(&self) -> Vec<UserId> {
        self.slots.iter().map(|(id, _)| *id).collect()
    }

    /// Frames in Positionsreihenfolge
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.slots.iter().map(|(_, f)| f)
    }

    pub fn frame_mut(&mut self, position: usize) -> Option<&mut Frame> {
        self.slots.get_mut(position).map(|(_, f)| f)
    }
}

// ---------------------------------------------------------------------------
// Statistik
// ---------------------------------------------------------------------------

/// Sendeseitige Statistik eines Nutzers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeStats {
    /// Gesendete Samples
    pub gesendet: u64,
    /// Summe `(x - y)^2` der Kompression
    pub kompandierungsfehler_summe: f64,
    /// Summe `(y - y_q)^2` der Quantisierung
    pub quantisierungsfehler_summe: f64,
}

impl EncodeStats {
    pub fn mse_kompandierung(&self) -> f64 {
        mittelwert(self.kompandierungsfehler_summe, self.gesendet)
    }

    pub fn mse_quantisierung(&self) -> f64 {
        mittelwert(self.quantisierungsfehler_summe, self.gesendet)
    }
}

fn mittelwert(summe: f64, anzahl: u64) -> f64 {
    if anzahl == 0 {
        0.0
    } else {
        summe / anzahl as f64
    }
}

// ---------------------------------------------------------------------------
// Multiplexer
// ---------------------------------------------------------------------------

/// Verschachtelt die Nutzer-Streams reihum zu Paketen
#[derive(Debug)]
pub struct Multiplexer {
    codec: FrameCodec,
    coder: SampleCoder,
    streams: BTreeMap<UserId, VecDeque<f64>>,
    aktiv: BTreeSet<UserId>,
    /// Anzahl ausgegebener Pakete
    runde: u64,
    /// Aktueller Slot (laeuft einmal pro Runde weiter)
    slot: usize,
    statistik: BTreeMap<UserId, EncodeStats>,
    ereignisse: Vec<LinkEreignis>,
}

impl Multiplexer {
    /// Erstellt den Multiplexer
    ///
    /// Die Anzahl der Streams muss `anzahl_nutzer` entsprechen, jeder Nutzer
    /// darf nur einmal vorkommen und alle Samples muessen endlich und in
    /// [-1, 1] liegen.
    pub fn neu(
        config: &LinkConfig,
        streams: impl IntoIterator<Item = (UserId, Vec<f64>)>,
    ) -> VoiceResult<Self> {
        config.validieren()?;
        let muster = SyncPattern::aus_config(config)?;
        let coder = SampleCoder::neu(config)?;
        let codec = FrameCodec::neu(muster, coder.nutzdaten_breite());

        let mut map = BTreeMap::new();
        for (user_id, samples) in streams {
            if let Some(&x) = samples.iter().find(|x| !x.is_finite()) {
                return Err(tdmlink_audio::AudioError::NonFinite(x).into());
            }
            if let Some(&x) = samples.iter().find(|x| x.abs() > 1.0) {
                return Err(tdmlink_audio::AudioError::OutOfRange(x).into());
            }
            if map.insert(user_id, VecDeque::from(samples)).is_some() {
                return Err(VoiceError::DoppelterNutzer(user_id));
            }
        }

        if map.len() != config.anzahl_nutzer {
            return Err(tdmlink_core::TdmError::konfiguration(format!(
                "{} Streams uebergeben, anzahl_nutzer ist {}",
                map.len(),
                config.anzahl_nutzer
            ))
            .into());
        }

        let aktiv: BTreeSet<UserId> = map.keys().copied().collect();
        let statistik = aktiv.iter().map(|&id| (id, EncodeStats::default())).collect();

        tracing::debug!(
            nutzer = aktiv.len(),
            frame_breite = codec.frame_breite(),
            "Multiplexer initialisiert"
        );

        Ok(Self {
            codec,
            coder,
            streams: map,
            aktiv,
            runde: 0,
            slot: 0,
            statistik,
            ereignisse: Vec::new(),
        })
    }

    /// Baut die naechste Runde
    ///
    /// Gibt `None` zurueck, sobald kein Nutzer mehr aktiv ist. Leere Runden
    /// werden nie ausgegeben und lassen den Slot-Zaehler unveraendert.
    pub fn build_round(&mut self) -> VoiceResult<Option<Packet>> {
        let mut kodiert_runde = Vec::with_capacity(self.aktiv.len());
        let mut beendet = Vec::new();

        // Erst alle Frames kodieren, dann Queues und Statistik fortschreiben
        for &user_id in &self.aktiv {
            let Some(&sample) = self.streams.get(&user_id).and_then(VecDeque::front) else {
                beendet.push(user_id);
                continue;
            };

            let kodiert = self.coder.kodieren(sample)?;
            let frame = self.codec.encode(&kodiert.nutzdaten, self.slot)?;
            kodiert_runde.push((user_id, frame, kodiert));
        }

        let mut slots = Vec::with_capacity(kodiert_runde.len());
        for (user_id, frame, kodiert) in kodiert_runde {
            if let Some(queue) = self.streams.get_mut(&user_id) {
                queue.pop_front();
            }
            let stats = self.statistik.entry(user_id).or_default();
            stats.gesendet += 1;
            stats.kompandierungsfehler_summe += kodiert.kompandierungsfehler;
            stats.quantisierungsfehler_summe += kodiert.quantisierungsfehler;
            slots.push((user_id, frame));
        }

        for user_id in beendet {
            self.aktiv.remove(&user_id);
            tracing::debug!(%user_id, runde = self.runde, "Nutzer-Stream beendet");
            self.ereignisse.push(LinkEreignis::NutzerBeendet {
                user_id,
                runde: self.runde,
            });
        }

        if slots.is_empty() {
            return Ok(None);
        }

        let paket = Packet::neu(self.runde, slots);
        tracing::trace!(
            paket = paket.index,
            slot = self.slot,
            frames = paket.len(),
            "Runde gebaut"
        );

        self.runde += 1;
        self.slot = (self.slot + 1) % self.codec.muster().len();
        Ok(Some(paket))
    }

    /// Alle konfigurierten Nutzer, aufsteigend
    pub fn nutzer(&self) -> Vec<UserId> {
        self.streams.keys().copied().collect()
    }

    /// Noch aktive Nutzer, aufsteigend
    pub fn aktive_nutzer(&self) -> Vec<UserId> {
        self.aktiv.iter().copied().collect()
    }

    /// Anzahl bereits ausgegebener Pakete
    pub fn runde(&self) -> u64 {
        self.runde
    }

    /// Slot, mit dem die naechste Runde kodiert wird
    pub fn slot_index(&self) -> usize {
        self.slot
    }

    /// Sendeseitige Statistik pro Nutzer
    pub fn encode_stats(&self) -> &BTreeMap<UserId, EncodeStats> {
        &self.statistik
    }

    /// Entnimmt die bisher gesammelten Ereignisse
    pub fn ereignisse_entnehmen(&mut self) -> Vec<LinkEreignis> {
        std::mem::take(&mut self.ereignisse)
    }
}

impl Iterator for Multiplexer {
    type Item = VoiceResult<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        self.build_round().transpose()
    }
}
