//! Fehlertypen fuer Quantisierung und Kompandierung

use tdmlink_core::CompandingLaw;
use thiserror::Error;

/// Alle moeglichen Fehler der Sample-Verarbeitung
#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("Degenerierter Wertebereich: min={min}, max={max}")]
    DegenerateRange { min: f64, max: f64 },

    #[error("Ungueltige Stufenanzahl: {0}")]
    InvalidLevelCount(usize),

    #[error("Koeffizient {koeffizient} ist fuer {kennlinie} nicht zulaessig")]
    InvalidCoefficient {
        kennlinie: CompandingLaw,
        koeffizient: f64,
    },

    #[error("Nicht-endlicher Wert: {0}")]
    NonFinite(f64),

    #[error("Wert {0} liegt ausserhalb von [-1, 1]")]
    OutOfRange(f64),

    #[error("Leere Eingabe")]
    LeereEingabe,

    #[error("Ungueltige Signalparameter: {0}")]
    Signal(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
