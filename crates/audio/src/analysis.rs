//! Fehleranalyse: gleichfoermige Quantisierung vs. Kompandierung
//!
//! Vergleicht den mittleren quadratischen Fehler einer gleichfoermigen
//! Quantisierung ueber den eigenen Wertebereich des Signals mit dem
//! Kompressionsfehler von A-Law und µ-Law bei mehreren Koeffizienten.

use serde::{Deserialize, Serialize};
use tdmlink_core::CompandingLaw;

use crate::compander::Compander;
use crate::error::{AudioError, AudioResult};
use crate::quantizer::{build_levels, quantize};

/// Welche Kennlinien und Koeffizienten verglichen werden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyseConfig {
    /// Koeffizienten fuer A-Law
    pub a_koeffizienten: Vec<f64>,
    /// Koeffizienten fuer µ-Law
    pub mu_koeffizienten: Vec<f64>,
    /// Stufenanzahl der gleichfoermigen Referenz-Quantisierung
    pub uniform_stufen: usize,
}

impl Default for AnalyseConfig {
    fn default() -> Self {
        Self {
            a_koeffizienten: vec![10.0, 87.6, 1000.0],
            mu_koeffizienten: vec![10.0, 255.0, 1000.0],
            uniform_stufen: 256,
        }
    }
}

/// MSE einer Kennlinie bei einem Koeffizienten
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KennlinienFehler {
    pub kennlinie: CompandingLaw,
    pub koeffizient: f64,
    pub mse: f64,
}

/// Ergebnis der Fehleranalyse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FehlerAnalyse {
    /// Anzahl analysierter Samples
    pub anzahl_samples: usize,
    /// Stufen der gleichfoermigen Quantisierung
    pub uniform_stufen: usize,
    /// MSE der gleichfoermigen Quantisierung
    pub uniform_mse: f64,
    /// MSE pro Kennlinie und Koeffizient, in Konfigurationsreihenfolge
    pub kennlinien: Vec<KennlinienFehler>,
}

impl FehlerAnalyse {
    /// Kennlinie mit dem kleinsten Fehler
    pub fn beste_kennlinie(&self) -> Option<&KennlinienFehler> {
        self.kennlinien
            .iter()
            .min_by(|a, b| a.mse.total_cmp(&b.mse))
    }
}

/// Fuehrt die Analyse fuer eine Sample-Folge durch
pub fn fehler_analysieren(samples: &[f64], config: &AnalyseConfig) -> AudioResult<FehlerAnalyse> {
    if samples.is_empty() {
        return Err(AudioError::LeereEingabe);
    }

    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    let levels = build_levels(min, max, config.uniform_stufen)?;
    let uniform = quantize(samples, &levels)?;
    let uniform_mse = uniform.mean_squared_error();

    let laeufe = config
        .a_koeffizienten
        .iter()
        .map(|&k| (CompandingLaw::ALaw, k))
        .chain(
            config
                .mu_koeffizienten
                .iter()
                .map(|&k| (CompandingLaw::MuLaw, k)),
        );

    let mut kennlinien = Vec::new();
    for (kennlinie, koeffizient) in laeufe {
        let compander = Compander::new(kennlinie, koeffizient)?;
        let mse = compander.encode_batch(samples)?.mean_squared_error();
        tracing::debug!(%kennlinie, koeffizient, mse, "Kennlinienfehler berechnet");
        kennlinien.push(KennlinienFehler {
            kennlinie,
            koeffizient,
            mse,
        });
    }

    tracing::info!(
        samples = samples.len(),
        uniform_stufen = config.uniform_stufen,
        uniform_mse,
        "Fehleranalyse abgeschlossen"
    );

    Ok(FehlerAnalyse {
        anzahl_samples: samples.len(),
        uniform_stufen: config.uniform_stufen,
        uniform_mse,
        kennlinien,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rampe() -> Vec<f64> {
        (0..=200).map(|i| i as f64 / 100.0 - 1.0).collect()
    }

    #[test]
    fn standard_sweep_hat_sechs_eintraege() {
        let analyse = fehler_analysieren(&rampe(), &AnalyseConfig::default()).unwrap();
        assert_eq!(analyse.anzahl_samples, 201);
        assert_eq!(analyse.kennlinien.len(), 6);
        assert_eq!(analyse.kennlinien[0].kennlinie, CompandingLaw::ALaw);
        assert_eq!(analyse.kennlinien[1].koeffizient, 87.6);
        assert_eq!(analyse.kennlinien[4].kennlinie, CompandingLaw::MuLaw);
        assert_eq!(analyse.kennlinien[4].koeffizient, 255.0);
    }

    #[test]
    fn fehler_sind_nicht_negativ() {
        let analyse = fehler_analysieren(&rampe(), &AnalyseConfig::default()).unwrap();
        assert!(analyse.uniform_mse >= 0.0);
        assert!(analyse.kennlinien.iter().all(|k| k.mse >= 0.0));
        assert!(analyse.beste_kennlinie().is_some());
    }

    #[test]
    fn groesserer_koeffizient_staerkere_kompression() {
        let config = AnalyseConfig {
            a_koeffizienten: vec![],
            mu_koeffizienten: vec![10.0, 1000.0],
            uniform_stufen: 16,
        };
        let analyse = fehler_analysieren(&rampe(), &config).unwrap();
        assert!(analyse.kennlinien[1].mse > analyse.kennlinien[0].mse);
    }

    #[test]
    fn leere_eingabe_fehler() {
        assert_eq!(
            fehler_analysieren(&[], &AnalyseConfig::default()),
            Err(AudioError::LeereEingabe)
        );
    }

    #[test]
    fn konstantes_signal_ist_degeneriert() {
        let err = fehler_analysieren(&[0.5; 10], &AnalyseConfig::default()).unwrap_err();
        assert!(matches!(err, AudioError::DegenerateRange { .. }));
    }

    #[test]
    fn analyse_ist_serialisierbar() {
        let analyse = fehler_analysieren(&rampe(), &AnalyseConfig::default()).unwrap();
        let json = serde_json::to_string(&analyse).unwrap();
        assert!(json.contains("\"uniform_mse\""));
        assert!(json.contains("\"mu_law\""));
    }
}
