//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `TDMLINK_LOG_LEVEL`: Filter (z.B. `debug` oder `tdmlink_voice=trace`), Standard: info
//! - `TDMLINK_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Die Umgebung hat Vorrang vor den Werten aus der Konfigurationsdatei.

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "TDMLINK_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "TDMLINK_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Liest `TDMLINK_LOG_LEVEL` und `TDMLINK_LOG_FORMAT` aus der Umgebung und
/// faellt auf die uebergebenen Werte bzw. `info` / `text` zurueck.
/// Ein bereits gesetzter globaler Subscriber bleibt bestehen.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());

    let ergebnis = match format_env.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if let Err(e) = ergebnis {
        tracing::debug!("Logging bereits initialisiert: {e}");
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level}");
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn doppelte_initialisierung_ohne_panic() {
        logging_initialisieren("warn", "text");
        logging_initialisieren("debug", "json");
    }
}
