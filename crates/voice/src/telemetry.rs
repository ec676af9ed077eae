//! Link-Telemetrie – Bericht pro Nutzer
//!
//! Fasst Sende- und Empfangsseite eines Laufs zusammen.
//!
//! ## Gesammelte Werte
//! - Gesendete und rekonstruierte Samples
//! - Framing-Fehler und ungueltige Nutzdaten
//! - MSE der Kompandierung, der Quantisierung und Ende-zu-Ende
//!
//! Der Ende-zu-Ende-Fehler vergleicht jeden rekonstruierten Sample mit dem
//! Original an derselben Sendeposition; verworfene Samples fallen heraus.

use std::collections::BTreeMap;

use serde::Serialize;
use tdmlink_core::{CompandingLaw, LinkEreignis, UserId};

use crate::demux::DemuxOutput;
use crate::error::StreamLengthMismatch;
use crate::mux::EncodeStats;

// ---------------------------------------------------------------------------
// Bericht pro Nutzer
// ---------------------------------------------------------------------------

/// Ergebnis eines Nutzers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutzerBericht {
    pub user_id: UserId,
    /// Gesendete Samples
    pub gesendet: u64,
    /// Rekonstruierte Samples
    pub rekonstruiert: u64,
    pub framing_fehler: u64,
    pub ungueltige_nutzdaten: u64,
    pub mse_kompandierung: f64,
    pub mse_quantisierung: f64,
    /// Rekonstruktion gegen Original, ausgerichtet nach Sendeposition
    pub mse_gesamt: f64,
    /// Gesetzt, wenn die positionale Zuordnung gebrochen wurde
    pub abgebrochen: Option<StreamLengthMismatch>,
    /// Rekonstruierte Samples (nicht serialisiert)
    #[serde(skip)]
    pub samples: Vec<f64>,
}

impl NutzerBericht {
    /// Anteil verlorener Samples (0.0–1.0)
    pub fn verlust_rate(&self) -> f64 {
        if self.gesendet == 0 {
            0.0
        } else {
            1.0 - self.rekonstruiert as f64 / self.gesendet as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Gesamtbericht
// ---------------------------------------------------------------------------

/// Bericht eines kompletten Link-Laufs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReport {
    pub kennlinie: CompandingLaw,
    pub koeffizient: f64,
    /// Uebertragene Pakete
    pub pakete: u64,
    /// Nach einem Laengenkonflikt verworfene Pakete
    pub verworfene_pakete: u64,
    pub framing_fehler_gesamt: u64,
    /// Aufsteigend nach Nutzer-ID
    pub nutzer: Vec<NutzerBericht>,
    pub ereignisse: Vec<LinkEreignis>,
}

impl LinkReport {
    /// Bericht eines Nutzers
    pub fn nutzer(&self, user_id: UserId) -> Option<&NutzerBericht> {
        self.nutzer.iter().find(|n| n.user_id == user_id)
    }

    /// Gibt eine lesbare Zusammenfassung zurueck
    pub fn zusammenfassung(&self) -> String {
        let mut text = format!(
            "{} (Koeffizient {}): {} Pakete, {} Framing-Fehler, {} verworfene Pakete",
            self.kennlinie,
            self.koeffizient,
            self.pakete,
            self.framing_fehler_gesamt,
            self.verworfene_pakete,
        );
        for n in &self.nutzer {
            text.push_str(&format!(
                "\n  {}: {}/{} Samples, Fehler={} MSE Kompandierung={:.3e} Quantisierung={:.3e} Gesamt={:.3e}{}",
                n.user_id,
                n.rekonstruiert,
                n.gesendet,
                n.framing_fehler,
                n.mse_kompandierung,
                n.mse_quantisierung,
                n.mse_gesamt,
                if n.abgebrochen.is_some() { " (abgebrochen)" } else { "" },
            ));
        }
        text
    }
}

/// Erstellt den Bericht aus Originalen, Sendestatistik und Demux-Ergebnis
///
/// `ereignisse` sind die Ereignisse der Sendeseite; die des Demultiplexers
/// werden angehaengt.
pub fn bericht_erstellen(
    kennlinie: CompandingLaw,
    koeffizient: f64,
    originale: &BTreeMap<UserId, Vec<f64>>,
    sendestatistik: &BTreeMap<UserId, EncodeStats>,
    mut ereignisse: Vec<LinkEreignis>,
    empfang: DemuxOutput,
) -> LinkReport {
    let mut empfangen = empfang.nutzer;

    let nutzer = originale
        .iter()
        .map(|(&user_id, original)| {
            let stats = sendestatistik.get(&user_id).cloned().unwrap_or_default();
            let rx = empfangen.remove(&user_id).unwrap_or_default();

            let (summe, anzahl) = rx
                .positionen
                .iter()
                .zip(&rx.samples)
                .filter_map(|(&pos, &r)| original.get(pos as usize).map(|&x| (x - r).powi(2)))
                .fold((0.0, 0u64), |(s, n), e| (s + e, n + 1));
            let mse_gesamt = if anzahl == 0 { 0.0 } else { summe / anzahl as f64 };

            NutzerBericht {
                user_id,
                gesendet: stats.gesendet,
                rekonstruiert: rx.samples.len() as u64,
                framing_fehler: rx.framing_fehler,
                ungueltige_nutzdaten: rx.ungueltige_nutzdaten,
                mse_kompandierung: stats.mse_kompandierung(),
                mse_quantisierung: stats.mse_quantisierung(),
                mse_gesamt,
                abgebrochen: rx.abgebrochen,
                samples: rx.samples,
            }
        })
        .collect();

    ereignisse.extend(empfang.ereignisse);

    LinkReport {
        kennlinie,
        koeffizient,
        pakete: empfang.pakete,
        verworfene_pakete: empfang.verworfene_pakete,
        framing_fehler_gesamt: empfang.framing_fehler.len() as u64,
        nutzer,
        ereignisse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demux::UserOutput;

    fn empfang() -> DemuxOutput {
        let mut nutzer = BTreeMap::new();
        nutzer.insert(
            UserId(0),
            UserOutput {
                samples: vec![0.1, 0.3],
                positionen: vec![0, 2],
                frames_gesehen: 3,
                framing_fehler: 1,
                ..UserOutput::default()
            },
        );
        DemuxOutput {
            nutzer,
            pakete: 3,
            ..DemuxOutput::default()
        }
    }

    #[test]
    fn gesamtfehler_nach_sendeposition() {
        let originale = BTreeMap::from([(UserId(0), vec![0.0, 0.5, 0.5])]);
        let stats = BTreeMap::from([(
            UserId(0),
            EncodeStats {
                gesendet: 3,
                kompandierungsfehler_summe: 0.3,
                quantisierungsfehler_summe: 0.03,
            },
        )]);
        let bericht = bericht_erstellen(
            CompandingLaw::MuLaw,
            10.0,
            &originale,
            &stats,
            Vec::new(),
            empfang(),
        );

        let n = bericht.nutzer(UserId(0)).unwrap();
        assert_eq!(n.gesendet, 3);
        assert_eq!(n.rekonstruiert, 2);
        assert_eq!(n.framing_fehler, 1);
        // (0.0 - 0.1)^2 und (0.5 - 0.3)^2
        assert!((n.mse_gesamt - (0.01 + 0.04) / 2.0).abs() < 1e-12);
        assert!((n.mse_kompandierung - 0.1).abs() < 1e-12);
        assert!((n.verlust_rate() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(bericht.pakete, 3);
    }

    #[test]
    fn nutzer_ohne_empfang_erscheint_im_bericht() {
        let originale = BTreeMap::from([(UserId(0), vec![0.0; 3]), (UserId(4), vec![])]);
        let bericht = bericht_erstellen(
            CompandingLaw::ALaw,
            87.6,
            &originale,
            &BTreeMap::new(),
            Vec::new(),
            empfang(),
        );
        let n = bericht.nutzer(UserId(4)).unwrap();
        assert_eq!(n.rekonstruiert, 0);
        assert_eq!(n.mse_gesamt, 0.0);
    }

    #[test]
    fn bericht_serialisierbar_ohne_samples() {
        let originale = BTreeMap::from([(UserId(0), vec![0.0; 3])]);
        let bericht = bericht_erstellen(
            CompandingLaw::MuLaw,
            10.0,
            &originale,
            &BTreeMap::new(),
            vec![LinkEreignis::NutzerBeendet {
                user_id: UserId(0),
                runde: 3,
            }],
            empfang(),
        );
        let json = serde_json::to_string(&bericht).unwrap();
        assert!(json.contains("\"mse_gesamt\""));
        assert!(json.contains("\"nutzer_beendet\""));
        assert!(!json.contains("\"samples\""));
        assert!(bericht.zusammenfassung().contains("µ-Law"));
    }
}
