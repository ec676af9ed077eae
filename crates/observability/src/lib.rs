//! # tdmlink-observability
//!
//! Observability-Crate fuer tdmlink:
//! - Prometheus-kompatible Link-Metriken (Textexport am Laufende)
//! - Structured Logging (text/json) via tracing-subscriber

pub mod logging;
pub mod metrics;

pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren};
pub use metrics::{LinkMetrics, MseStufe};
