//! Link-Konfiguration
//!
//! Alle Simulationsparameter werden als ein Wert durch die Konstruktoren von
//! Multiplexer und Demultiplexer gereicht. Es gibt keinen prozessweiten
//! Zustand. Die Standardwerte entsprechen dem klassischen Versuchsaufbau:
//! 6 Nutzer, Muster `1111010000`, µ-Law mit Koeffizient 10, 8 kHz, 256 Stufen.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TdmError};
use crate::types::UserId;

/// Obergrenze fuer Quantisierungsstufen (Nutzdaten hoechstens 16 Bit breit)
pub const MAX_QUANTISIERUNGSSTUFEN: usize = 1 << 16;

// ---------------------------------------------------------------------------
// Kompandierungs-Gesetz
// ---------------------------------------------------------------------------

/// Kompandierungs-Kennlinie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompandingLaw {
    /// A-Law (europaeische Kennlinie, Koeffizient A > 1)
    ALaw,
    /// µ-Law (nordamerikanische Kennlinie, Koeffizient M > 0)
    MuLaw,
}

impl CompandingLaw {
    /// Prueft ob ein Koeffizient fuer diese Kennlinie zulaessig ist
    pub fn koeffizient_gueltig(&self, koeffizient: f64) -> bool {
        if !koeffizient.is_finite() {
            return false;
        }
        match self {
            Self::ALaw => koeffizient > 1.0,
            Self::MuLaw => koeffizient > 0.0,
        }
    }
}

impl std::fmt::Display for CompandingLaw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ALaw => write!(f, "A-Law"),
            Self::MuLaw => write!(f, "µ-Law"),
        }
    }
}

// ---------------------------------------------------------------------------
// Nutzer-Zuordnung im Demultiplexer
// ---------------------------------------------------------------------------

/// Wie der Demultiplexer Frames einem Nutzer zuordnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAssignment {
    /// Jedes Paket traegt die Slot-Belegung (Nutzer-ID pro Frame-Position)
    #[default]
    Tagged,
    /// Position j im Paket gehoert zum j-ten konfigurierten Nutzer.
    /// Nur gueltig, wenn alle Streams gleich lang sind.
    Positional,
}

// ---------------------------------------------------------------------------
// LinkConfig
// ---------------------------------------------------------------------------

/// Vollstaendige Konfiguration eines TDM-Links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Anzahl der Sprachkanaele
    pub anzahl_nutzer: usize,
    /// Samples pro Rahmen (= Laenge des Sync-Musters)
    pub samples_pro_frame: usize,
    /// Sync-Muster als Bit-String, z.B. "1111010000"
    pub sync_muster: String,
    /// Kompandierungs-Kennlinie
    pub kennlinie: CompandingLaw,
    /// Koeffizient der Kennlinie (A bzw. M)
    pub koeffizient: f64,
    /// Anzahl der Quantisierungsstufen
    pub quantisierungsstufen: usize,
    /// Gemeinsame Abtastrate aller Streams in Hz
    pub ziel_abtastrate: u32,
    /// Frame-Zuordnung im Demultiplexer
    pub zuordnung: UserAssignment,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            anzahl_nutzer: 6,
            samples_pro_frame: 10,
            sync_muster: "1111010000".into(),
            kennlinie: CompandingLaw::MuLaw,
            koeffizient: 10.0,
            quantisierungsstufen: 256,
            ziel_abtastrate: 8000,
            zuordnung: UserAssignment::Tagged,
        }
    }
}

impl LinkConfig {
    /// Validiert alle Felder und ihre Abhaengigkeiten
    pub fn validieren(&self) -> Result<()> {
        if self.anzahl_nutzer == 0 {
            return Err(TdmError::konfiguration("anzahl_nutzer muss >= 1 sein"));
        }
        if self.samples_pro_frame == 0 {
            return Err(TdmError::konfiguration("samples_pro_frame muss >= 1 sein"));
        }

        let bits = self.sync_bits()?;
        if bits.len() != self.samples_pro_frame {
            return Err(TdmError::SyncMuster {
                muster: self.sync_muster.clone(),
                grund: format!(
                    "Laenge {} passt nicht zu samples_pro_frame {}",
                    bits.len(),
                    self.samples_pro_frame
                ),
            });
        }

        if !self.kennlinie.koeffizient_gueltig(self.koeffizient) {
            return Err(TdmError::konfiguration(format!(
                "Koeffizient {} ist fuer {} nicht zulaessig",
                self.koeffizient, self.kennlinie
            )));
        }

        if self.quantisierungsstufen < 2 || self.quantisierungsstufen > MAX_QUANTISIERUNGSSTUFEN
        {
            return Err(TdmError::konfiguration(format!(
                "quantisierungsstufen muss zwischen 2 und {} liegen (war: {})",
                MAX_QUANTISIERUNGSSTUFEN, self.quantisierungsstufen
            )));
        }

        if self.ziel_abtastrate == 0 {
            return Err(TdmError::konfiguration("ziel_abtastrate muss > 0 sein"));
        }

        Ok(())
    }

    /// Parst das Sync-Muster in eine Bitfolge
    pub fn sync_bits(&self) -> Result<Vec<bool>> {
        sync_muster_parsen(&self.sync_muster)
    }

    /// Breite der Nutzdaten in Bit (ceil(log2(stufen)), mindestens 1)
    pub fn nutzdaten_breite(&self) -> usize {
        let hoechster_index = self.quantisierungsstufen.saturating_sub(1);
        let breite = (usize::BITS - hoechster_index.leading_zeros()) as usize;
        breite.max(1)
    }

    /// Breite eines Frames in Bit (Sync-Bit + Nutzdaten)
    pub fn frame_breite(&self) -> usize {
        1 + self.nutzdaten_breite()
    }

    /// Die konfigurierten Nutzer in aufsteigender Reihenfolge (0..anzahl_nutzer)
    pub fn nutzer(&self) -> Vec<UserId> {
        (0..self.anzahl_nutzer as u32).map(UserId::new).collect()
    }
}

/// Parst eine Bitfolge aus '0'/'1'; leere Muster sind ungueltig
pub fn sync_muster_parsen(muster: &str) -> Result<Vec<bool>> {
    if muster.is_empty() {
        return Err(TdmError::SyncMuster {
            muster: String::new(),
            grund: "Muster ist leer".into(),
        });
    }

    muster
        .chars()
        .enumerate()
        .map(|(pos, c)| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            andere => Err(TdmError::SyncMuster {
                muster: muster.to_string(),
                grund: format!("Zeichen '{andere}' an Position {pos}"),
            }),
        })
        .collect()
}
