//! Simulator-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Simulator ohne Konfigurationsdatei
//! lauffaehig ist (6 Nutzer, µ-Law mit Koeffizient 10, 8 kHz, 256 Stufen).

use serde::{Deserialize, Serialize};
use tdmlink_audio::{AnalyseConfig, Ton};
use tdmlink_core::LinkConfig;
use tdmlink_observability::{log_format_gueltig, log_level_gueltig};
use tdmlink_voice::Stoerung;

/// Vollstaendige Simulator-Konfiguration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// TDM-Link (Nutzer, Sync-Muster, Kennlinie, Stufen)
    pub link: LinkConfig,
    /// Testsignale pro Nutzer
    pub signal: SignalEinstellungen,
    /// Kanalstoerungen zwischen Sender und Empfaenger
    pub impairment: Stoerung,
    /// Fehleranalyse vor dem Lauf
    pub analysis: AnalyseEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Ausgabe des Berichts
    pub report: BerichtEinstellungen,
}

/// Testsignale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalEinstellungen {
    /// Abtastrate der Signale; leer = `link.ziel_abtastrate`
    pub abtastrate: Option<u32>,
    /// Ein Ton pro Nutzer, in Nutzer-Reihenfolge
    pub toene: Vec<Ton>,
    /// Verstaerkung in dB vor dem Normalisieren (0.0 = unveraendert)
    pub verstaerkung_db: f64,
    /// Spitzenwert jedes Signals auf 1.0 skalieren
    pub normalisieren: bool,
    /// Vorderer Anteil jedes Signals, der uebertragen wird (0.0..=1.0)
    pub anteil: f64,
}

impl Default for SignalEinstellungen {
    fn default() -> Self {
        Self {
            abtastrate: None,
            toene: (1..=6)
                .map(|i| Ton {
                    frequenz_hz: 100.0 * (i as f64 + 2.0),
                    ..Ton::default()
                })
                .collect(),
            verstaerkung_db: 0.0,
            normalisieren: false,
            anteil: 1.0,
        }
    }
}

/// Fehleranalyse (gleichfoermig vs. Kompandierung)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyseEinstellungen {
    /// Analyse vor dem Lauf ausfuehren
    pub aktiviert: bool,
    #[serde(flatten)]
    pub parameter: AnalyseConfig,
}

impl Default for AnalyseEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            parameter: AnalyseConfig::default(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Ausgabe des Berichts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerichtEinstellungen {
    /// JSON-Bericht in diese Datei schreiben (leer = nicht schreiben)
    pub json_pfad: Option<String>,
    /// Prometheus-Metriken am Laufende ausgeben
    pub metriken_exportieren: bool,
}

impl SimConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        config
            .validieren()
            .map_err(|e| anyhow::anyhow!("Ungueltige Konfiguration in '{pfad}': {e}"))?;
        Ok(config)
    }

    /// Prueft die Abhaengigkeiten zwischen den Abschnitten
    pub fn validieren(&self) -> anyhow::Result<()> {
        self.link.validieren()?;

        if self.signal.toene.len() != self.link.anzahl_nutzer {
            anyhow::bail!(
                "{} Toene konfiguriert, anzahl_nutzer ist {}",
                self.signal.toene.len(),
                self.link.anzahl_nutzer
            );
        }

        if let Some(rate) = self.signal.abtastrate {
            if rate != self.link.ziel_abtastrate {
                anyhow::bail!(
                    "Signal-Abtastrate {rate} Hz weicht von ziel_abtastrate {} Hz ab (kein Resampling)",
                    self.link.ziel_abtastrate
                );
            }
        }

        if !(0.0..=1.0).contains(&self.signal.anteil) {
            anyhow::bail!(
                "signal.anteil muss zwischen 0 und 1 liegen (war: {})",
                self.signal.anteil
            );
        }

        if !self.signal.verstaerkung_db.is_finite() {
            anyhow::bail!(
                "signal.verstaerkung_db muss endlich sein (war: {})",
                self.signal.verstaerkung_db
            );
        }

        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!(
                "Unbekannter Log-Level '{}' (trace, debug, info, warn, error)",
                self.logging.level
            );
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!(
                "Unbekanntes Log-Format '{}' (text, json)",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Abtastrate, mit der die Signale erzeugt werden
    pub fn abtastrate(&self) -> u32 {
        self.signal.abtastrate.unwrap_or(self.link.ziel_abtastrate)
    }
}
