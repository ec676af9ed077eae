//! Link-Lauf: Sender- und Empfaenger-Task
//!
//! Der Sender treibt den Multiplexer und legt jedes fertige Paket in einen
//! begrenzten tokio-Kanal. Der Empfaenger gibt ganze Pakete an den
//! Demultiplexer. Zwischen beiden kann eine Kanalstoerung Sync-Bits kippen.
//! Pakete sind die einzige Uebergabe zwischen den Tasks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tdmlink_core::{LinkConfig, UserId};
use tokio::sync::mpsc;

use crate::demux::Demultiplexer;
use crate::error::{VoiceError, VoiceResult};
use crate::mux::{EncodeStats, Multiplexer, Packet};
use crate::telemetry::{bericht_erstellen, LinkReport};

/// Kapazitaet des Paketkanals zwischen Sender und Empfaenger
pub const KANAL_KAPAZITAET: usize = 64;

// ---------------------------------------------------------------------------
// Kanalstoerung
// ---------------------------------------------------------------------------

/// Kippt das Sync-Bit des Frames an `position` in Paket `paket_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBitFlip {
    pub paket_index: u64,
    pub position: usize,
}

/// Stoerungen, die auf dem Kanal angewendet werden
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stoerung {
    pub sync_bit_kippen: Vec<SyncBitFlip>,
}

impl Stoerung {
    pub fn ist_leer(&self) -> bool {
        self.sync_bit_kippen.is_empty()
    }

    /// Wendet alle Stoerungen fuer dieses Paket an
    ///
    /// Gibt die Anzahl gekippter Bits zurueck. Positionen ausserhalb des
    /// Pakets werden ignoriert.
    pub fn anwenden(&self, paket: &mut Packet) -> usize {
        let index = paket.index;
        let mut gekippt = 0;
        for flip in self.sync_bit_kippen.iter().filter(|f| f.paket_index == index) {
            match paket.frame_mut(flip.position) {
                Some(frame) => {
                    frame.sync_bit_kippen();
                    gekippt += 1;
                    tracing::debug!(
                        paket = index,
                        position = flip.position,
                        "Sync-Bit gekippt"
                    );
                }
                None => tracing::warn!(
                    paket = index,
                    position = flip.position,
                    laenge = paket.len(),
                    "Stoerposition ausserhalb des Pakets"
                ),
            }
        }
        gekippt
    }
}

// ---------------------------------------------------------------------------
// Lauf
// ---------------------------------------------------------------------------

/// Fuehrt einen kompletten Link-Lauf aus
///
/// # Fehler
/// Konfigurations- und Audiofehler brechen den Lauf ab. Framing-Fehler
/// landen im Bericht.
pub async fn link_ausfuehren(
    config: LinkConfig,
    streams: BTreeMap<UserId, Vec<f64>>,
    stoerung: Stoerung,
) -> VoiceResult<LinkReport> {
    let mut mux = Multiplexer::neu(&config, streams.clone())?;
    let mut demux = Demultiplexer::mit_nutzern(&config, mux.nutzer())?;

    if !stoerung.ist_leer() {
        tracing::info!(
            sync_bit_kippen = stoerung.sync_bit_kippen.len(),
            "Kanalstoerung aktiv"
        );
    }

    let (tx, mut rx) = mpsc::channel::<Packet>(KANAL_KAPAZITAET);

    let sender = tokio::spawn(async move {
        let mut gesendet = 0u64;
        while let Some(mut paket) = mux.build_round()? {
            stoerung.anwenden(&mut paket);
            if tx.send(paket).await.is_err() {
                return Err(VoiceError::KanalGeschlossen(
                    "Empfaenger nicht mehr erreichbar".into(),
                ));
            }
            gesendet += 1;
        }
        tracing::debug!(pakete = gesendet, "Sender fertig");
        let statistik: BTreeMap<UserId, EncodeStats> = mux.encode_stats().clone();
        Ok::<_, VoiceError>((statistik, mux.ereignisse_entnehmen()))
    });

    let empfaenger = tokio::spawn(async move {
        while let Some(paket) = rx.recv().await {
            demux.process_packet(&paket)?;
        }
        Ok::<_, VoiceError>(demux.finish())
    });

    let (sender, empfaenger) = tokio::join!(sender, empfaenger);
    let empfang = empfaenger.map_err(|e| VoiceError::Task(e.to_string()))??;
    let (statistik, ereignisse) = sender.map_err(|e| VoiceError::Task(e.to_string()))??;

    let bericht = bericht_erstellen(
        config.kennlinie,
        config.koeffizient,
        &streams,
        &statistik,
        ereignisse,
        empfang,
    );

    tracing::info!(
        kennlinie = %bericht.kennlinie,
        pakete = bericht.pakete,
        framing_fehler = bericht.framing_fehler_gesamt,
        nutzer = bericht.nutzer.len(),
        "Link-Lauf abgeschlossen"
    );

    Ok(bericht)
}
