//! Demultiplexer mit Sync-Pruefung
//!
//! Ordnet jeden Frame eines Pakets einem Nutzer zu, prueft das Sync-Bit gegen
//! den eigenen Slot-Cursor des Nutzers und rekonstruiert den Sample.
//!
//! ## Zuordnung
//! - `Tagged`: die Slot-Belegung des Pakets bestimmt den Nutzer
//! - `Positional`: Position j gehoert zum j-ten konfigurierten Nutzer; ein
//!   Paket mit abweichender Laenge schliesst alle Rekonstruktionen ab
//!
//! Ein falsches Sync-Bit kostet genau einen Sample eines Nutzers. Der Cursor
//! laeuft in jedem Fall weiter, eine Neusynchronisation findet nicht statt.

use std::collections::BTreeMap;

use tdmlink_core::{LinkConfig, LinkEreignis, UserAssignment, UserId};

use crate::coder::SampleCoder;
use crate::error::{FramingError, StreamLengthMismatch, VoiceError, VoiceResult};
use crate::frame::FrameCodec;
use crate::mux::Packet;
use crate::sync::SyncPattern;

// ---------------------------------------------------------------------------
// Empfangszustand
// ---------------------------------------------------------------------------

/// Empfangszustand eines Nutzers (wird beim ersten Frame angelegt)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiveState {
    /// Slot des naechsten erwarteten Frames (`frames_gesehen mod Musterlaenge`)
    pub slot_cursor: usize,
    /// Alle gesehenen Frames, gueltig oder nicht
    pub frames_gesehen: u64,
    /// Rekonstruierte Samples
    pub samples: Vec<f64>,
    /// Sendeposition (Frame-Nummer des Nutzers) jedes rekonstruierten Samples
    pub empfangene_positionen: Vec<u64>,
    pub framing_fehler: u64,
    pub ungueltige_nutzdaten: u64,
    /// Gesetzt sobald die positionale Zuordnung gebrochen wurde
    pub abgebrochen: Option<StreamLengthMismatch>,
}

impl ReceiveState {
    fn weiter(&mut self, muster_laenge: usize) {
        self.frames_gesehen += 1;
        self.slot_cursor = (self.frames_gesehen % muster_laenge as u64) as usize;
    }
}

// ---------------------------------------------------------------------------
// Ergebnis
// ---------------------------------------------------------------------------

/// Ergebnis fuer einen Nutzer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOutput {
    pub samples: Vec<f64>,
    pub positionen: Vec<u64>,
    pub frames_gesehen: u64,
    pub framing_fehler: u64,
    pub ungueltige_nutzdaten: u64,
    pub abgebrochen: Option<StreamLengthMismatch>,
}

impl From<ReceiveState> for UserOutput {
    fn from(s: ReceiveState) -> Self {
        Self {
            samples: s.samples,
            positionen: s.empfangene_positionen,
            frames_gesehen: s.frames_gesehen,
            framing_fehler: s.framing_fehler,
            ungueltige_nutzdaten: s.ungueltige_nutzdaten,
            abgebrochen: s.abgebrochen,
        }
    }
}

/// Ergebnis eines Demultiplex-Laufs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemuxOutput {
    /// Rekonstruktion pro Nutzer, aufsteigend
    pub nutzer: BTreeMap<UserId, UserOutput>,
    /// Alle Framing-Fehler in Empfangsreihenfolge
    pub framing_fehler: Vec<FramingError>,
    pub ereignisse: Vec<LinkEreignis>,
    /// Verarbeitete Pakete
    pub pakete: u64,
    /// Nach einem Laengenkonflikt verworfene Pakete
    pub verworfene_pakete: u64,
}

impl DemuxOutput {
    pub fn framing_fehler_anzahl(&self) -> usize {
        self.framing_fehler.len()
    }

    /// Rekonstruierte Samples eines Nutzers
    pub fn samples(&self, user_id: UserId) -> Option<&[f64]> {
        self.nutzer.get(&user_id).map(|n| n.samples.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Demultiplexer
// ---------------------------------------------------------------------------

/// Dekodierter Frame, noch nicht in den Empfangszustand uebernommen
#[derive(Debug)]
enum FrameErgebnis {
    Sample(f64),
    UngueltigerIndex { index: usize, stufen: usize },
    Framing(FramingError),
}

/// Zerlegt Pakete wieder in Nutzer-Streams
#[derive(Debug)]
pub struct Demultiplexer {
    codec: FrameCodec,
    coder: SampleCoder,
    zuordnung: UserAssignment,
    /// Konfigurierte Nutzer fuer die positionale Zuordnung
    nutzer: Vec<UserId>,
    zustaende: BTreeMap<UserId, ReceiveState>,
    framing_fehler: Vec<FramingError>,
    ereignisse: Vec<LinkEreignis>,
    pakete: u64,
    verworfene_pakete: u64,
    konflikt: Option<StreamLengthMismatch>,
}

impl Demultiplexer {
    /// Demultiplexer fuer die Nutzer `0..anzahl_nutzer`
    pub fn neu(config: &LinkConfig) -> VoiceResult<Self> {
        Self::mit_nutzern(config, config.nutzer())
    }

    /// Demultiplexer mit expliziter Nutzerliste (fuer `Positional` relevant)
    pub fn mit_nutzern(config: &LinkConfig, mut nutzer: Vec<UserId>) -> VoiceResult<Self> {
        config.validieren()?;
        nutzer.sort_unstable();
        if let Some(w) = nutzer.windows(2).find(|w| w[0] == w[1]) {
            return Err(VoiceError::DoppelterNutzer(w[0]));
        }

        let muster = SyncPattern::aus_config(config)?;
        let coder = SampleCoder::neu(config)?;
        let codec = FrameCodec::neu(muster, coder.nutzdaten_breite());

        Ok(Self {
            codec,
            coder,
            zuordnung: config.zuordnung,
            nutzer,
            zustaende: BTreeMap::new(),
            framing_fehler: Vec::new(),
            ereignisse: Vec::new(),
            pakete: 0,
            verworfene_pakete: 0,
            konflikt: None,
        })
    }

    /// Verarbeitet ein vollstaendiges Paket
    ///
    /// Framing-Fehler und ungueltige Nutzdaten werden gezaehlt und kosten je
    /// einen Sample. Fatal sind nur falsche Frame-Breiten und Audiofehler.
    /// Alle Frames werden zuerst dekodiert; erst wenn das ganze Paket
    /// durchlaeuft, aendert sich der Empfangszustand. Ein fataler Fehler
    /// hinterlaesst den Demultiplexer unveraendert.
    pub fn process_packet(&mut self, paket: &Packet) -> VoiceResult<()> {
        if self.konflikt.is_some() {
            self.pakete += 1;
            self.verworfene_pakete += 1;
            tracing::debug!(paket = paket.index, "Paket nach Laengenkonflikt verworfen");
            return Ok(());
        }

        let zuordnung: Vec<UserId> = match self.zuordnung {
            UserAssignment::Tagged => paket.user_ids(),
            UserAssignment::Positional => {
                if paket.len() != self.nutzer.len() {
                    self.pakete += 1;
                    self.konflikt_melden(StreamLengthMismatch {
                        paket_index: paket.index,
                        erwartet: self.nutzer.len(),
                        erhalten: paket.len(),
                    });
                    return Ok(());
                }
                self.nutzer.clone()
            }
        };

        let ergebnisse = self.paket_dekodieren(paket, zuordnung)?;

        self.pakete += 1;
        let muster_laenge = self.codec.muster().len();
        for (user_id, position, ergebnis) in ergebnisse {
            let zustand = self.zustaende.entry(user_id).or_default();
            match ergebnis {
                FrameErgebnis::Sample(sample) => {
                    zustand.samples.push(sample);
                    zustand.empfangene_positionen.push(position);
                }
                FrameErgebnis::UngueltigerIndex { index, stufen } => {
                    zustand.ungueltige_nutzdaten += 1;
                    tracing::warn!(
                        %user_id,
                        paket = paket.index,
                        index,
                        stufen,
                        "Ungueltiger Nutzdaten-Index, Sample verworfen"
                    );
                }
                FrameErgebnis::Framing(fehler) => {
                    zustand.framing_fehler += 1;
                    tracing::warn!(
                        %user_id,
                        paket = fehler.paket_index,
                        slot = fehler.slot_index,
                        "Sync-Bit passt nicht zum Muster, Sample verworfen"
                    );
                    self.ereignisse.push(LinkEreignis::FramingFehler {
                        user_id,
                        paket_index: fehler.paket_index,
                        slot_index: fehler.slot_index,
                    });
                    self.framing_fehler.push(fehler);
                }
            }
            zustand.weiter(muster_laenge);
        }

        Ok(())
    }

    /// Dekodiert alle Frames eines Pakets ohne Zustand zu veraendern
    ///
    /// Die Cursor werden lokal fortgeschrieben, damit ein Nutzer auch mehrfach
    /// im selben Paket vorkommen darf.
    fn paket_dekodieren(
        &self,
        paket: &Packet,
        zuordnung: Vec<UserId>,
    ) -> VoiceResult<Vec<(UserId, u64, FrameErgebnis)>> {
        let muster_laenge = self.codec.muster().len() as u64;
        let mut gesehen: BTreeMap<UserId, u64> = BTreeMap::new();
        let mut ergebnisse = Vec::with_capacity(paket.len());

        for (user_id, frame) in zuordnung.into_iter().zip(paket.frames()) {
            let position = gesehen.entry(user_id).or_insert_with(|| {
                self.zustaende
                    .get(&user_id)
                    .map_or(0, |z| z.frames_gesehen)
            });
            let slot = (*position % muster_laenge) as usize;

            let ergebnis = match self.codec.decode(frame, slot, user_id, paket.index) {
                Ok(nutzdaten) => match self.coder.dekodieren(&nutzdaten) {
                    Ok(sample) => FrameErgebnis::Sample(sample),
                    Err(VoiceError::PayloadIndex { index, stufen }) => {
                        FrameErgebnis::UngueltigerIndex { index, stufen }
                    }
                    Err(e) => return Err(e),
                },
                Err(VoiceError::Framing(fehler)) => FrameErgebnis::Framing(fehler),
                Err(e) => return Err(e),
            };

            ergebnisse.push((user_id, *position, ergebnis));
            *position += 1;
        }

        Ok(ergebnisse)
    }

    fn konflikt_melden(&mut self, konflikt: StreamLengthMismatch) {
        tracing::warn!(
            paket = konflikt.paket_index,
            erwartet = konflikt.erwartet,
            erhalten = konflikt.erhalten,
            "Paketlaenge passt nicht zur Nutzeranzahl, Rekonstruktion abgeschlossen"
        );

        for user_id in &self.nutzer {
            self.zustaende.entry(*user_id).or_default().abgebrochen = Some(konflikt.clone());
        }
        self.ereignisse.push(LinkEreignis::StreamLaengenKonflikt {
            paket_index: konflikt.paket_index,
            erwartet: konflikt.erwartet,
            erhalten: konflikt.erhalten,
        });
        self.verworfene_pakete += 1;
        self.konflikt = Some(konflikt);
    }

    /// Zustand eines Nutzers (falls schon ein Frame gesehen wurde)
    pub fn zustand(&self, user_id: UserId) -> Option<&ReceiveState> {
        self.zustaende.get(&user_id)
    }

    /// Bisher gezaehlte Framing-Fehler
    pub fn framing_fehler_anzahl(&self) -> usize {
        self.framing_fehler.len()
    }

    /// Erster Laengenkonflikt (nur `Positional`)
    pub fn konflikt(&self) -> Option<&StreamLengthMismatch> {
        self.konflikt.as_ref()
    }

    /// Schliesst den Lauf ab und gibt alle Rekonstruktionen heraus
    pub fn finish(self) -> DemuxOutput {
        tracing::debug!(
            pakete = self.pakete,
            nutzer = self.zustaende.len(),
            framing_fehler = self.framing_fehler.len(),
            "Demultiplexer abgeschlossen"
        );

        DemuxOutput {
            nutzer: self
                .zustaende
                .into_iter()
                .map(|(id, z)| (id, UserOutput::from(z)))
                .collect(),
            framing_fehler: self.framing_fehler,
            ereignisse: self.ereignisse,
            pakete: self.pakete,
            verworfene_pakete: self.verworfene_pakete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::Multiplexer;
    use bitvec::prelude::*;

    fn config(nutzer: usize, zuordnung: UserAssignment) -> LinkConfig {
        LinkConfig {
            anzahl_nutzer: nutzer,
            zuordnung,
            ..LinkConfig::default()
        }
    }

    fn rampe(n: usize, versatz: f64) -> Vec<f64> {
        (0..n).map(|i| (versatz + 0.05 * i as f64).min(1.0)).collect()
    }

    fn pakete(config: &LinkConfig, laengen: &[usize]) -> Vec<Packet> {
        let streams = laengen
            .iter()
            .enumerate()
            .map(|(i, &n)| (UserId(i as u32), rampe(n, -0.5 + 0.2 * i as f64)));
        Multiplexer::neu(config, streams)
            .unwrap()
            .collect::<VoiceResult<_>>()
            .unwrap()
    }

    #[test]
    fn ungestoerter_lauf_rekonstruiert_alle_samples() {
        let cfg = config(3, UserAssignment::Tagged);
        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        for p in pakete(&cfg, &[12, 7, 12]) {
            demux.process_packet(&p).unwrap();
        }
        let out = demux.finish();
        assert_eq!(out.framing_fehler_anzahl(), 0);
        assert_eq!(out.pakete, 12);
        assert_eq!(out.samples(UserId(0)).unwrap().len(), 12);
        assert_eq!(out.samples(UserId(1)).unwrap().len(), 7);
        assert_eq!(out.samples(UserId(2)).unwrap().len(), 12);

        let original = rampe(7, -0.3);
        for (r, x) in out.samples(UserId(1)).unwrap().iter().zip(original) {
            assert!((r - x).abs() < 0.02, "r={r} x={x}");
        }
    }

    #[test]
    fn ein_gekipptes_sync_bit_kostet_einen_sample() {
        let cfg = config(3, UserAssignment::Tagged);
        let mut pakete = pakete(&cfg, &[10, 10, 10]);
        pakete[4].frame_mut(1).unwrap().sync_bit_kippen();

        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        for p in &pakete {
            demux.process_packet(p).unwrap();
        }
        let out = demux.finish();

        assert_eq!(out.framing_fehler_anzahl(), 1);
        let fehler = &out.framing_fehler[0];
        assert_eq!(fehler.user_id, UserId(1));
        assert_eq!(fehler.paket_index, 4);
        assert_eq!(fehler.slot_index, 4);

        assert_eq!(out.nutzer[&UserId(0)].samples.len(), 10);
        assert_eq!(out.nutzer[&UserId(1)].samples.len(), 9);
        assert_eq!(out.nutzer[&UserId(2)].samples.len(), 10);
        assert_eq!(out.nutzer[&UserId(1)].frames_gesehen, 10);
        assert!(!out.nutzer[&UserId(1)].positionen.contains(&4));
        assert!(out.ereignisse.iter().any(LinkEreignis::ist_framing_fehler));
    }

    #[test]
    fn positional_bei_gleichen_laengen() {
        let cfg = config(2, UserAssignment::Positional);
        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        for p in pakete(&cfg, &[6, 6]) {
            demux.process_packet(&p).unwrap();
        }
        let out = demux.finish();
        assert_eq!(out.nutzer[&UserId(0)].samples.len(), 6);
        assert_eq!(out.nutzer[&UserId(1)].samples.len(), 6);
        assert!(out.nutzer.values().all(|n| n.abgebrochen.is_none()));
    }

    #[test]
    fn positional_laengenkonflikt_schliesst_rekonstruktion() {
        let cfg = config(3, UserAssignment::Positional);
        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        for p in pakete(&cfg, &[5, 3, 5]) {
            demux.process_packet(&p).unwrap();
        }
        assert_eq!(demux.konflikt().unwrap().paket_index, 3);
        let out = demux.finish();

        assert_eq!(out.pakete, 5);
        assert_eq!(out.verworfene_pakete, 2);
        for nutzer in out.nutzer.values() {
            assert_eq!(nutzer.samples.len(), 3);
            let konflikt = nutzer.abgebrochen.as_ref().unwrap();
            assert_eq!(konflikt.erwartet, 3);
            assert_eq!(konflikt.erhalten, 2);
        }
        assert!(out
            .ereignisse
            .iter()
            .any(|e| matches!(e, LinkEreignis::StreamLaengenKonflikt { paket_index: 3, .. })));
    }

    #[test]
    fn falsche_frame_breite_ist_fatal() {
        let cfg = config(1, UserAssignment::Tagged);
        let fremd = LinkConfig {
            quantisierungsstufen: 16,
            ..cfg.clone()
        };
        let pakete = pakete(&fremd, &[2]);
        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        assert!(matches!(
            demux.process_packet(&pakete[0]),
            Err(VoiceError::FrameWidth { .. })
        ));
    }

    #[test]
    fn fataler_fehler_hinterlaesst_kein_halbes_paket() {
        let cfg = config(2, UserAssignment::Tagged);
        let muster = SyncPattern::aus_config(&cfg).unwrap();
        let breite = SampleCoder::neu(&cfg).unwrap().nutzdaten_breite();
        let gueltig = crate::frame::encode_frame(&muster, &bitvec![u8, Msb0; 1; breite], 0);
        let zu_schmal = crate::frame::encode_frame(&muster, bits![u8, Msb0; 1, 0], 0);
        let paket = Packet::neu(0, vec![(UserId(0), gueltig), (UserId(1), zu_schmal)]);

        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        assert!(matches!(
            demux.process_packet(&paket),
            Err(VoiceError::FrameWidth { erhalten: 3, .. })
        ));
        assert!(demux.zustand(UserId(0)).is_none());
        assert!(demux.zustand(UserId(1)).is_none());

        let out = demux.finish();
        assert_eq!(out.pakete, 0);
        assert!(out.nutzer.is_empty());
    }

    #[test]
    fn ungueltiger_index_wird_gezaehlt() {
        // 5 Stufen in 3 Bit: Index 7 ist nicht belegt
        let cfg = LinkConfig {
            anzahl_nutzer: 1,
            quantisierungsstufen: 5,
            ..LinkConfig::default()
        };
        let muster = SyncPattern::aus_config(&cfg).unwrap();
        let frame = crate::frame::encode_frame(&muster, bits![u8, Msb0; 1, 1, 1], 0);
        let paket = Packet::neu(0, vec![(UserId(0), frame)]);

        let mut demux = Demultiplexer::neu(&cfg).unwrap();
        demux.process_packet(&paket).unwrap();
        let zustand = demux.zustand(UserId(0)).unwrap();
        assert_eq!(zustand.ungueltige_nutzdaten, 1);
        assert_eq!(zustand.slot_cursor, 1);
        assert!(zustand.samples.is_empty());
    }

    #[test]
    fn doppelte_nutzerliste_abgelehnt() {
        let cfg = config(2, UserAssignment::Positional);
        assert!(matches!(
            Demultiplexer::mit_nutzern(&cfg, vec![UserId(1), UserId(1)]),
            Err(VoiceError::DoppelterNutzer(_))
        ));
    }
}
