//! Zyklisches Sync-Muster
//!
//! Jeder Slot bekommt das Musterbit `muster[slot mod laenge]`. Der Empfaenger
//! erkennt Versatz daran, dass das beobachtete Bit vom erwarteten abweicht.

use std::fmt;
use std::str::FromStr;

use tdmlink_core::{sync_muster_parsen, LinkConfig, TdmError};

/// Feste Bitfolge, zyklisch ueber den Slot-Index adressiert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPattern {
    bits: Vec<bool>,
}

impl SyncPattern {
    /// Erstellt ein Muster aus einer nicht-leeren Bitfolge
    pub fn neu(bits: Vec<bool>) -> Result<Self, TdmError> {
        if bits.is_empty() {
            return Err(TdmError::SyncMuster {
                muster: String::new(),
                grund: "Muster ist leer".into(),
            });
        }
        Ok(Self { bits })
    }

    /// Liest das Muster aus der Link-Konfiguration
    pub fn aus_config(config: &LinkConfig) -> Result<Self, TdmError> {
        Self::neu(config.sync_bits()?)
    }

    /// Musterbit fuer einen Slot (zyklisch)
    pub fn bit(&self, slot: usize) -> bool {
        self.bits[slot % self.bits.len()]
    }

    /// Laenge des Musters
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Immer false – leere Muster lassen sich nicht konstruieren
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl FromStr for SyncPattern {
    type Err = TdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::neu(sync_muster_parsen(s)?)
    }
}

impl fmt::Display for SyncPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bits {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muster_zyklisch_adressiert() {
        let muster: SyncPattern = "1111010000".parse().unwrap();
        assert_eq!(muster.len(), 10);
        assert!(muster.bit(0));
        assert!(!muster.bit(4));
        assert!(muster.bit(5));
        // Slot 15 == Slot 5
        assert_eq!(muster.bit(15), muster.bit(5));
        assert_eq!(muster.bit(23), muster.bit(3));
    }

    #[test]
    fn leeres_muster_abgelehnt() {
        assert!(SyncPattern::neu(vec![]).is_err());
        assert!("".parse::<SyncPattern>().is_err());
    }

    #[test]
    fn fremdzeichen_abgelehnt() {
        let err = "10a1".parse::<SyncPattern>().unwrap_err();
        assert!(err.to_string().contains("Position 2"));
    }

    #[test]
    fn display_gibt_bitstring_zurueck() {
        let muster: SyncPattern = "0110".parse().unwrap();
        assert_eq!(muster.to_string(), "0110");
    }

    #[test]
    fn aus_standard_config() {
        let muster = SyncPattern::aus_config(&LinkConfig::default()).unwrap();
        assert_eq!(muster.to_string(), "1111010000");
    }
}
