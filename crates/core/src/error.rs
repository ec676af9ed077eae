//! Fehlertypen fuer tdmlink
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende.
//! Audio- und Voice-Crate definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer tdmlink
pub type Result<T> = std::result::Result<T, TdmError>;

/// Crate-uebergreifende Fehler
#[derive(Debug, Error)]
pub enum TdmError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Ungueltiges Sync-Muster '{muster}': {grund}")]
    SyncMuster { muster: String, grund: String },
}

impl TdmError {
    /// Erstellt einen Konfigurationsfehler aus einer beliebigen Nachricht
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }
}
