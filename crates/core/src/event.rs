//! Link-Ereignisse
//!
//! Nicht-fatale Vorkommnisse eines Laufs. Sie werden vom Multiplexer und
//! Demultiplexer gesammelt, im Bericht serialisiert und per tracing geloggt.

use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// Alle Ereignisse, die waehrend eines Link-Laufs auftreten koennen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "art", rename_all = "snake_case")]
pub enum LinkEreignis {
    /// Ein Nutzer hat keine Samples mehr und verlaesst den aktiven Satz
    NutzerBeendet { user_id: UserId, runde: u64 },
    /// Sync-Bit passte nicht zum erwarteten Musterbit; Sample verworfen
    FramingFehler {
        user_id: UserId,
        paket_index: u64,
        slot_index: usize,
    },
    /// Positionale Zuordnung verletzt (Paketlaenge != Nutzeranzahl)
    StreamLaengenKonflikt {
        paket_index: u64,
        erwartet: usize,
        erhalten: usize,
    },
}

impl LinkEreignis {
    /// Prueft ob es sich um einen Framing-Fehler handelt
    pub fn ist_framing_fehler(&self) -> bool {
        matches!(self, Self::FramingFehler { .. })
    }
}
