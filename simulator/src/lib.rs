//! tdmlink-sim – Bibliotheks-Root
//!
//! Erzeugt die Testsignale, fuehrt optional die Fehleranalyse aus, laesst den
//! TDM-Link laufen und schreibt den Bericht. Stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tdmlink_audio::{
    fehler_analysieren, kuerzen, normalisieren, ton_erzeugen, verstaerken, FehlerAnalyse,
};
use tdmlink_core::{LinkEreignis, UserId};
use tdmlink_observability::{LinkMetrics, MseStufe};
use tdmlink_voice::{link_ausfuehren, LinkReport};

use config::SimConfig;

/// Fehleranalyse eines Nutzersignals
#[derive(Debug, Clone, Serialize)]
pub struct NutzerAnalyse {
    pub user_id: UserId,
    #[serde(flatten)]
    pub analyse: FehlerAnalyse,
}

/// Ergebnis eines Simulationslaufs
#[derive(Debug, Clone, Serialize)]
pub struct SimErgebnis {
    pub zeitstempel: DateTime<Utc>,
    pub version: &'static str,
    /// Leer wenn die Analyse deaktiviert ist
    pub analyse: Vec<NutzerAnalyse>,
    pub link: LinkReport,
}

/// Haelt Konfiguration und Metriken eines Simulators zusammen
pub struct Simulator {
    pub config: SimConfig,
    metriken: LinkMetrics,
}

impl Simulator {
    /// Erstellt einen neuen Simulator aus der gegebenen Konfiguration
    pub fn neu(config: SimConfig) -> Result<Self> {
        config.validieren()?;
        Ok(Self {
            config,
            metriken: LinkMetrics::neu()?,
        })
    }

    pub fn metriken(&self) -> &LinkMetrics {
        &self.metriken
    }

    /// Erzeugt ein Signal pro Nutzer (Nutzer-IDs `0..anzahl_nutzer`)
    pub fn signale_erzeugen(&self) -> Result<BTreeMap<UserId, Vec<f64>>> {
        let abtastrate = self.config.abtastrate();
        let signal = &self.config.signal;

        self.config
            .link
            .nutzer()
            .into_iter()
            .zip(&signal.toene)
            .map(|(user_id, ton)| {
                let mut samples = ton_erzeugen(ton, abtastrate)?;
                if signal.verstaerkung_db != 0.0 {
                    samples = verstaerken(&samples, signal.verstaerkung_db).map_err(|e| {
                        anyhow::anyhow!("Verstaerkung fuer {user_id} fehlgeschlagen: {e}")
                    })?;
                }
                if signal.normalisieren {
                    normalisieren(&mut samples);
                }
                let samples = kuerzen(&samples, signal.anteil).to_vec();
                tracing::debug!(
                    %user_id,
                    frequenz_hz = ton.frequenz_hz,
                    samples = samples.len(),
                    "Signal erzeugt"
                );
                Ok::<_, anyhow::Error>((user_id, samples))
            })
            .collect()
    }

    /// Fuehrt einen kompletten Lauf aus
    ///
    /// Reihenfolge:
    /// 1. Signale erzeugen
    /// 2. Fehleranalyse (falls aktiviert)
    /// 3. Link-Lauf (Sender- und Empfaenger-Task)
    /// 4. Metriken aktualisieren, Bericht schreiben
    pub async fn ausfuehren(&self) -> Result<SimErgebnis> {
        let signale = self.signale_erzeugen()?;

        tracing::info!(
            nutzer = signale.len(),
            kennlinie = %self.config.link.kennlinie,
            koeffizient = self.config.link.koeffizient,
            stufen = self.config.link.quantisierungsstufen,
            "Simulation startet"
        );

        let analyse = if self.config.analysis.aktiviert {
            self.analysieren(&signale)
        } else {
            Vec::new()
        };

        let start = Instant::now();
        let bericht = link_ausfuehren(
            self.config.link.clone(),
            signale,
            self.config.impairment.clone(),
        )
        .await?;
        self.metriken
            .laufzeit_sekunden
            .observe(start.elapsed().as_secs_f64());

        self.metriken_erfassen(&bericht);

        let ergebnis = SimErgebnis {
            zeitstempel: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            analyse,
            link: bericht,
        };

        if let Some(pfad) = &self.config.report.json_pfad {
            bericht_schreiben(&ergebnis, pfad)?;
        }

        Ok(ergebnis)
    }

    fn analysieren(&self, signale: &BTreeMap<UserId, Vec<f64>>) -> Vec<NutzerAnalyse> {
        let mut ergebnisse = Vec::with_capacity(signale.len());
        for (&user_id, samples) in signale {
            let analyse = match fehler_analysieren(samples, &self.config.analysis.parameter) {
                Ok(analyse) => analyse,
                Err(e) => {
                    tracing::warn!(%user_id, "Fehleranalyse uebersprungen: {e}");
                    continue;
                }
            };
            if let Some(beste) = analyse.beste_kennlinie() {
                tracing::info!(
                    %user_id,
                    uniform_mse = analyse.uniform_mse,
                    beste = %beste.kennlinie,
                    koeffizient = beste.koeffizient,
                    mse = beste.mse,
                    "Fehleranalyse"
                );
            }
            ergebnisse.push(NutzerAnalyse { user_id, analyse });
        }
        ergebnisse
    }

    fn metriken_erfassen(&self, bericht: &LinkReport) {
        let m = &self.metriken;
        m.pakete_total.inc_by(bericht.pakete);
        m.verworfene_pakete_total.inc_by(bericht.verworfene_pakete);
        m.nutzer_beendet_total.inc_by(
            bericht
                .ereignisse
                .iter()
                .filter(|e| matches!(e, LinkEreignis::NutzerBeendet { .. }))
                .count() as u64,
        );

        for n in &bericht.nutzer {
            let user = n.user_id.to_string();
            m.frames_total.inc_by(n.gesendet);
            m.framing_fehler_zaehlen(&user, n.framing_fehler);
            m.mse_setzen(&user, MseStufe::Kompandierung, n.mse_kompandierung);
            m.mse_setzen(&user, MseStufe::Quantisierung, n.mse_quantisierung);
            m.mse_setzen(&user, MseStufe::Gesamt, n.mse_gesamt);
            m.verlust_rate.observe(n.verlust_rate());
        }
    }
}

/// Schreibt das Ergebnis als JSON
pub fn bericht_schreiben(ergebnis: &SimErgebnis, pfad: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(ergebnis)?;
    std::fs::write(pfad, json)
        .map_err(|e| anyhow::anyhow!("Bericht '{pfad}' nicht schreibbar: {e}"))?;
    tracing::info!(pfad = pfad, "Bericht geschrieben");
    Ok(())
}
