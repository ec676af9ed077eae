//! Fehlertypen der TDM-Engine
//!
//! `FramingError` ist nicht fatal: der Demultiplexer faengt ihn ab, meldet ihn
//! und verwirft genau einen Sample. Alle anderen Varianten brechen die
//! jeweilige Operation ab.

use serde::Serialize;
use tdmlink_audio::AudioError;
use tdmlink_core::{TdmError, UserId};
use thiserror::Error;

/// Sync-Bit passte nicht zum erwarteten Musterbit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Framing-Fehler bei {user_id}: Paket {paket_index}, Slot {slot_index}")]
pub struct FramingError {
    pub user_id: UserId,
    pub paket_index: u64,
    pub slot_index: usize,
}

/// Positionale Zuordnung verletzt: Paketlaenge != Nutzeranzahl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error(
    "Stream-Laengen-Konflikt in Paket {paket_index}: erwartet {erwartet} Frames, erhalten {erhalten}"
)]
pub struct StreamLengthMismatch {
    pub paket_index: u64,
    pub erwartet: usize,
    pub erhalten: usize,
}

/// Alle Fehler der TDM-Engine
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    StreamLengthMismatch(#[from] StreamLengthMismatch),

    #[error("Ungueltige Frame-Breite: erwartet {erwartet} Bit, erhalten {erhalten}")]
    FrameWidth { erwartet: usize, erhalten: usize },

    #[error("Nutzdaten-Index {index} ausserhalb von {stufen} Stufen")]
    PayloadIndex { index: usize, stufen: usize },

    #[error("Nutzer {0} mehrfach angegeben")]
    DoppelterNutzer(UserId),

    #[error("Audiofehler: {0}")]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Konfiguration(#[from] TdmError),

    #[error("Kanal geschlossen: {0}")]
    KanalGeschlossen(String),

    #[error("Task-Fehler: {0}")]
    Task(String),
}

pub type VoiceResult<T> = Result<T, VoiceError>;
