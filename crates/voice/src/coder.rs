//! Sample <-> Nutzdaten-Bits
//!
//! Sendeseite: Kompander -> unipolare Abbildung `u = (y + 1) / 2` ->
//! Quantisierung gegen `build_levels(0, 1, stufen)` -> Stufenindex als
//! `nutzdaten_breite` Bit, MSB zuerst.
//!
//! Empfangsseite: Bits -> Index -> Schwelle `u` -> `y = 2u - 1` -> Expansion.

use bitvec::prelude::*;
use tdmlink_audio::{build_levels, quantize_sample, Compander, QuantizationLevels};
use tdmlink_core::LinkConfig;

use crate::error::{VoiceError, VoiceResult};
use crate::frame::Bits;

/// Ein kodierter Sample samt Fehlerbeitraegen je Stufe
#[derive(Debug, Clone, PartialEq)]
pub struct KodierterSample {
    /// Stufenindex als Bitfolge
    pub nutzdaten: Bits,
    /// `(x - y)^2` der Kompression
    pub kompandierungsfehler: f64,
    /// `(y - y_q)^2` der Quantisierung (im kompandierten Bereich)
    pub quantisierungsfehler: f64,
}

/// Wandelt Samples in Nutzdaten und zurueck
#[derive(Debug, Clone)]
pub struct SampleCoder {
    compander: Compander,
    stufen: QuantizationLevels,
    nutzdaten_breite: usize,
}

impl SampleCoder {
    /// Erstellt den Coder aus der Link-Konfiguration
    pub fn neu(config: &LinkConfig) -> VoiceResult<Self> {
        let compander = Compander::new(config.kennlinie, config.koeffizient)?;
        let stufen = build_levels(0.0, 1.0, config.quantisierungsstufen)?;
        Ok(Self {
            compander,
            stufen,
            nutzdaten_breite: config.nutzdaten_breite(),
        })
    }

    pub fn compander(&self) -> &Compander {
        &self.compander
    }

    pub fn nutzdaten_breite(&self) -> usize {
        self.nutzdaten_breite
    }

    /// Kodiert einen Sample aus [-1, 1]
    pub fn kodieren(&self, sample: f64) -> VoiceResult<KodierterSample> {
        let (y, kompandierungsfehler) = self.compander.encode(sample)?;
        let snap = quantize_sample(&self.stufen, (y + 1.0) / 2.0)?;
        let y_q = bipolar(snap.value);

        Ok(KodierterSample {
            nutzdaten: index_zu_bits(snap.index, self.nutzdaten_breite),
            kompandierungsfehler,
            quantisierungsfehler: (y - y_q).powi(2),
        })
    }

    /// Dekodiert Nutzdaten zurueck in einen Sample
    pub fn dekodieren(&self, nutzdaten: &BitSlice<u8, Msb0>) -> VoiceResult<f64> {
        if nutzdaten.len() != self.nutzdaten_breite {
            return Err(VoiceError::FrameWidth {
                erwartet: 1 + self.nutzdaten_breite,
                erhalten: 1 + nutzdaten.len(),
            });
        }

        let index = bits_zu_index(nutzdaten);
        let u = self.stufen.get(index).ok_or(VoiceError::PayloadIndex {
            index,
            stufen: self.stufen.len(),
        })?;

        Ok(self.compander.decode(bipolar(u))?)
    }
}

/// `u` in [0, 1] -> `y` in [-1, 1]
fn bipolar(u: f64) -> f64 {
    (2.0 * u - 1.0).clamp(-1.0, 1.0)
}

fn index_zu_bits(index: usize, breite: usize) -> Bits {
    let mut bits = Bits::with_capacity(breite);
    for i in (0..breite).rev() {
        bits.push((index >> i) & 1 == 1);
    }
    bits
}

fn bits_zu_index(bits: &BitSlice<u8, Msb0>) -> usize {
    bits.iter()
        .by_vals()
        .fold(0usize, |acc, b| (acc << 1) | usize::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdmlink_core::CompandingLaw;

    fn coder(stufen: usize) -> SampleCoder {
        SampleCoder::neu(&LinkConfig {
            quantisierungsstufen: stufen,
            ..LinkConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn index_bits_msb_zuerst() {
        let bits = index_zu_bits(0b1011, 6);
        assert_eq!(bits, bitvec![u8, Msb0; 0, 0, 1, 0, 1, 1]);
        assert_eq!(bits_zu_index(&bits), 0b1011);
    }

    #[test]
    fn nutzdaten_haben_konfigurierte_breite() {
        let c = coder(256);
        let k = c.kodieren(0.3).unwrap();
        assert_eq!(k.nutzdaten.len(), 8);
        assert_eq!(c.nutzdaten_breite(), 8);
    }

    #[test]
    fn roundtrip_innerhalb_der_stufenaufloesung() {
        let c = coder(1024);
        for x in [-0.9, -0.25, 0.1, 0.5, 0.77] {
            let k = c.kodieren(x).unwrap();
            let zurueck = c.dekodieren(&k.nutzdaten).unwrap();
            assert!((zurueck - x).abs() < 0.05, "x={x} zurueck={zurueck}");
        }
    }

    #[test]
    fn fehlerbeitraege_sind_konsistent() {
        let c = coder(256);
        let k = c.kodieren(0.4).unwrap();
        let (_, kompandierung) = c.compander().encode(0.4).unwrap();
        assert_eq!(k.kompandierungsfehler, kompandierung);
        // Quantisierungsschritt im bipolaren Bereich: 2/256
        assert!(k.quantisierungsfehler <= (2.0f64 / 256.0).powi(2));
    }

    #[test]
    fn a_law_coder() {
        let c = SampleCoder::neu(&LinkConfig {
            kennlinie: CompandingLaw::ALaw,
            koeffizient: 87.6,
            ..LinkConfig::default()
        })
        .unwrap();
        let k = c.kodieren(-0.6).unwrap();
        let zurueck = c.dekodieren(&k.nutzdaten).unwrap();
        assert!((zurueck + 0.6).abs() < 0.05);
    }

    #[test]
    fn index_ausserhalb_der_stufen() {
        // 5 Stufen -> 3 Bit, Index 7 existiert nicht
        let c = coder(5);
        let err = c.dekodieren(bits![u8, Msb0; 1, 1, 1]).unwrap_err();
        assert!(matches!(
            err,
            VoiceError::PayloadIndex {
                index: 7,
                stufen: 5
            }
        ));
    }

    #[test]
    fn sample_ausserhalb_bereich_ist_fehler() {
        let c = coder(256);
        assert!(matches!(c.kodieren(1.2), Err(VoiceError::Audio(_))));
    }
}
