//! Gemeinsame Identifikationstypen
//!
//! Newtype-Pattern, damit Benutzer-IDs nicht mit Slot- oder Paket-Indizes
//! verwechselt werden. Die Ordnung der IDs bestimmt die Reihenfolge der
//! Frames innerhalb eines Pakets.

use serde::{Deserialize, Serialize};

/// Benutzer-ID eines Sprachkanals im TDM-Link
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl UserId {
    /// Erstellt eine UserId aus einem Rohwert
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl From<u32> for UserId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}
