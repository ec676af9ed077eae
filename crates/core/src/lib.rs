//! tdmlink-core – Gemeinsame Typen, Konfiguration und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Audio-Crate, Voice-Crate
//! und Simulator gemeinsam nutzen: Benutzer-IDs, die Link-Konfiguration
//! und die Ereignisse, die waehrend eines Laufs anfallen.

pub mod config;
pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use config::{sync_muster_parsen, CompandingLaw, LinkConfig, UserAssignment};
pub use error::{Result, TdmError};
pub use event::LinkEreignis;
pub use types::UserId;
