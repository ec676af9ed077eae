//! A-Law / µ-Law Kompandierung
//!
//! Komprimiert den Dynamikbereich vor der Quantisierung, damit leise Anteile
//! mehr Aufloesung bekommen. Jede Kennlinie liefert auch die exakte Umkehrung
//! (Expansion) fuer den Empfangspfad.
//!
//! ## Kennlinien
//! ```text
//! A-Law:  k = 1 + ln(A)
//!         |x| < 1/A :  y = A|x| / k
//!         |x| >= 1/A:  y = (1 + ln(A|x|)) / k
//! µ-Law:  y = ln(1 + M|x|) / ln(1 + M)
//! ```
//! Das Vorzeichen wird uebernommen, `sign(0) = 0`.

use tdmlink_core::CompandingLaw;

use crate::error::{AudioError, AudioResult};

/// Kompander mit vorberechneten Konstanten
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Compander {
    ALaw {
        a: f64,
        /// 1 / A
        inv_a: f64,
        /// 1 + ln(A)
        k: f64,
    },
    MuLaw {
        m: f64,
        /// ln(1 + M)
        ln_eins_plus_m: f64,
    },
}

impl Compander {
    /// Erstellt einen Kompander fuer Kennlinie und Koeffizient
    pub fn new(kennlinie: CompandingLaw, koeffizient: f64) -> AudioResult<Self> {
        if !kennlinie.koeffizient_gueltig(koeffizient) {
            return Err(AudioError::InvalidCoefficient {
                kennlinie,
                koeffizient,
            });
        }

        Ok(match kennlinie {
            CompandingLaw::ALaw => Self::ALaw {
                a: koeffizient,
                inv_a: 1.0 / koeffizient,
                k: 1.0 + koeffizient.ln(),
            },
            CompandingLaw::MuLaw => Self::MuLaw {
                m: koeffizient,
                ln_eins_plus_m: koeffizient.ln_1p(),
            },
        })
    }

    /// A-Law-Kompander mit Koeffizient `a`
    pub fn a_law(a: f64) -> AudioResult<Self> {
        Self::new(CompandingLaw::ALaw, a)
    }

    /// µ-Law-Kompander mit Koeffizient `m`
    pub fn mu_law(m: f64) -> AudioResult<Self> {
        Self::new(CompandingLaw::MuLaw, m)
    }

    /// Kennlinie dieses Kompanders
    pub fn kennlinie(&self) -> CompandingLaw {
        match self {
            Self::ALaw { .. } => CompandingLaw::ALaw,
            Self::MuLaw { .. } => CompandingLaw::MuLaw,
        }
    }

    /// Koeffizient (A bzw. M)
    pub fn koeffizient(&self) -> f64 {
        match *self {
            Self::ALaw { a, .. } => a,
            Self::MuLaw { m, .. } => m,
        }
    }

    /// Komprimiert einen Sample aus [-1, 1]
    ///
    /// Gibt den komprimierten Wert und `(x - y)^2` zurueck.
    pub fn encode(&self, x: f64) -> AudioResult<(f64, f64)> {
        pruefen(x)?;
        let betrag = x.abs();

        let y = match *self {
            Self::ALaw { a, inv_a, k } => {
                if betrag < inv_a {
                    a * betrag / k
                } else {
                    (1.0 + (a * betrag).ln()) / k
                }
            }
            Self::MuLaw { m, ln_eins_plus_m } => (m * betrag).ln_1p() / ln_eins_plus_m,
        };

        let komprimiert = (vorzeichen(x) * y).clamp(-1.0, 1.0);
        Ok((komprimiert, (x - komprimiert).powi(2)))
    }

    /// Expandiert einen komprimierten Wert zurueck nach [-1, 1]
    pub fn decode(&self, y: f64) -> AudioResult<f64> {
        pruefen(y)?;
        let betrag = y.abs();

        let x = match *self {
            Self::ALaw { a, k, .. } => {
                if betrag < 1.0 / k {
                    betrag * k / a
                } else {
                    (betrag * k - 1.0).exp() / a
                }
            }
            Self::MuLaw { m, ln_eins_plus_m } => (betrag * ln_eins_plus_m).exp_m1() / m,
        };

        Ok((vorzeichen(y) * x).clamp(-1.0, 1.0))
    }

    /// Komprimiert eine Sample-Folge und summiert die quadratischen Fehler
    pub fn encode_batch(&self, samples: &[f64]) -> AudioResult<Companded> {
        let mut ergebnis = Companded {
            values: Vec::with_capacity(samples.len()),
            squared_error_sum: 0.0,
        };
        for &x in samples {
            let (y, fehler) = self.encode(x)?;
            ergebnis.values.push(y);
            ergebnis.squared_error_sum += fehler;
        }
        Ok(ergebnis)
    }

    /// Expandiert eine Folge komprimierter Werte
    pub fn decode_batch(&self, values: &[f64]) -> AudioResult<Vec<f64>> {
        values.iter().map(|&y| self.decode(y)).collect()
    }
}

/// Ergebnis einer Batch-Kompression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Companded {
    /// Komprimierte Werte in [-1, 1]
    pub values: Vec<f64>,
    /// Summe der quadratischen Fehler gegenueber der Eingabe
    pub squared_error_sum: f64,
}

impl Companded {
    /// Mittlerer quadratischer Fehler (0 bei leerer Eingabe)
    pub fn mean_squared_error(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.squared_error_sum / self.values.len() as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

fn pruefen(wert: f64) -> AudioResult<()> {
    if !wert.is_finite() {
        return Err(AudioError::NonFinite(wert));
    }
    if wert.abs() > 1.0 {
        return Err(AudioError::OutOfRange(wert));
    }
    Ok(())
}

fn vorzeichen(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANZ: f64 = 1e-12;

    #[test]
    fn mu_law_roundtrip() {
        let c = Compander::mu_law(255.0).unwrap();
        for x in [-1.0, -0.5, 0.5, 1.0] {
            let (y, _) = c.encode(x).unwrap();
            let zurueck = c.decode(y).unwrap();
            assert!((zurueck - x).abs() < TOLERANZ, "x={x} zurueck={zurueck}");
        }
    }

    #[test]
    fn null_bleibt_exakt_null() {
        for c in [
            Compander::mu_law(10.0).unwrap(),
            Compander::a_law(87.6).unwrap(),
        ] {
            let (y, fehler) = c.encode(0.0).unwrap();
            assert_eq!(y, 0.0);
            assert_eq!(fehler, 0.0);
            assert_eq!(c.decode(0.0).unwrap(), 0.0);
        }
    }

    #[test]
    fn a_law_stetig_an_der_grenze() {
        let a = 87.6;
        let c = Compander::a_law(a).unwrap();
        let k = 1.0 + f64::ln(a);
        // Grenzwert des Kleinsignal-Zweigs bei |x| = 1/A
        let kleinsignal = a * (1.0 / a) / k;
        let (y, _) = c.encode(1.0 / a).unwrap();
        assert!((y - kleinsignal).abs() < 1e-9);
        // knapp darunter liegt im Kleinsignal-Zweig und ist ebenfalls nah
        let (y_unten, _) = c.encode(1.0 / a - 1e-12).unwrap();
        assert!((y_unten - kleinsignal).abs() < 1e-9);
    }

    #[test]
    fn a_law_roundtrip_beide_zweige() {
        let c = Compander::a_law(87.6).unwrap();
        for x in [-1.0, -0.3, -0.005, 0.001, 0.01, 0.2, 0.9, 1.0] {
            let (y, _) = c.encode(x).unwrap();
            let zurueck = c.decode(y).unwrap();
            assert!((zurueck - x).abs() < 1e-12, "x={x} zurueck={zurueck}");
        }
    }

    #[test]
    fn vollaussteuerung_bildet_auf_eins_ab() {
        for c in [
            Compander::mu_law(255.0).unwrap(),
            Compander::a_law(87.6).unwrap(),
        ] {
            let (y, _) = c.encode(1.0).unwrap();
            assert!((y - 1.0).abs() < TOLERANZ);
            let (y, _) = c.encode(-1.0).unwrap();
            assert!((y + 1.0).abs() < TOLERANZ);
        }
    }

    #[test]
    fn kompression_hebt_leise_anteile_an() {
        let c = Compander::mu_law(255.0).unwrap();
        let (y, fehler) = c.encode(0.01).unwrap();
        assert!(y > 0.01);
        assert!((fehler - (0.01 - y).powi(2)).abs() < TOLERANZ);
    }

    #[test]
    fn ungueltige_koeffizienten() {
        assert!(matches!(
            Compander::a_law(1.0),
            Err(AudioError::InvalidCoefficient { .. })
        ));
        assert!(matches!(
            Compander::mu_law(-2.0),
            Err(AudioError::InvalidCoefficient { .. })
        ));
        assert!(Compander::mu_law(f64::INFINITY).is_err());
    }

    #[test]
    fn ungueltige_eingaben_sind_typisierte_fehler() {
        let c = Compander::a_law(87.6).unwrap();
        assert_eq!(c.encode(1.5), Err(AudioError::OutOfRange(1.5)));
        assert!(matches!(c.encode(f64::NAN), Err(AudioError::NonFinite(_))));
        assert!(matches!(c.decode(-1.01), Err(AudioError::OutOfRange(_))));
    }

    #[test]
    fn batch_summiert_fehler() {
        let c = Compander::mu_law(10.0).unwrap();
        let samples = [0.1, -0.4, 0.0, 0.8];
        let batch = c.encode_batch(&samples).unwrap();
        assert_eq!(batch.values.len(), 4);

        let summe: f64 = samples.iter().map(|&x| c.encode(x).unwrap().1).sum();
        assert!((batch.squared_error_sum - summe).abs() < TOLERANZ);
        assert!((batch.mean_squared_error() - summe / 4.0).abs() < TOLERANZ);

        let expandiert = c.decode_batch(&batch.values).unwrap();
        for (e, x) in expandiert.iter().zip(samples) {
            assert!((e - x).abs() < 1e-12);
        }
    }

    #[test]
    fn kennlinie_und_koeffizient_abfragbar() {
        let c = Compander::new(CompandingLaw::ALaw, 87.6).unwrap();
        assert_eq!(c.kennlinie(), CompandingLaw::ALaw);
        assert_eq!(c.koeffizient(), 87.6);
    }
}
