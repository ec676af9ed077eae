//! tdmlink Simulator – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt einen Lauf aus.

use anyhow::Result;
use tdmlink_observability::logging_initialisieren;
use tdmlink_sim::{config::SimConfig, Simulator};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("TDMLINK_CONFIG").unwrap_or_else(|_| "tdmlink.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = SimConfig::laden(&config_pfad)?;

    // Logging initialisieren
    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "tdmlink Simulator wird initialisiert"
    );

    let simulator = Simulator::neu(config)?;
    let ergebnis = simulator.ausfuehren().await?;

    println!("{}", ergebnis.link.zusammenfassung());

    if simulator.config.report.metriken_exportieren {
        println!("{}", simulator.metriken().exportieren()?);
    }

    Ok(())
}
