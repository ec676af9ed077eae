//! Prometheus-kompatible Metriken eines Link-Laufs
//!
//! Registrierte Metriken:
//! - `tdmlink_packets_total` – Counter: Uebertragene Pakete
//! - `tdmlink_frames_total` – Counter: Uebertragene Frames
//! - `tdmlink_dropped_packets_total` – Counter: Nach Laengenkonflikt verworfene Pakete
//! - `tdmlink_framing_errors_total` – Counter: Framing-Fehler (user)
//! - `tdmlink_users_finished_total` – Counter: Beendete Nutzer-Streams
//! - `tdmlink_mse` – Gauge: MSE je Nutzer und Stufe (user, stage)
//! - `tdmlink_sample_loss_ratio` – Histogram: Anteil verlorener Samples pro Nutzer
//! - `tdmlink_run_duration_seconds` – Histogram: Dauer eines Laufs

use anyhow::Result;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Verarbeitungsstufe fuer die MSE-Gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MseStufe {
    Kompandierung,
    Quantisierung,
    Gesamt,
}

impl MseStufe {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kompandierung => "companding",
            Self::Quantisierung => "quantization",
            Self::Gesamt => "end_to_end",
        }
    }
}

/// Alle tdmlink-Prometheus-Metriken
#[derive(Clone)]
pub struct LinkMetrics {
    pub registry: Arc<Registry>,

    pub pakete_total: IntCounter,
    pub frames_total: IntCounter,
    pub verworfene_pakete_total: IntCounter,
    pub framing_fehler_total: IntCounterVec,
    pub nutzer_beendet_total: IntCounter,
    pub mse: GaugeVec,
    pub verlust_rate: Histogram,
    pub laufzeit_sekunden: Histogram,
}

impl LinkMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let pakete_total = IntCounter::with_opts(Opts::new(
            "tdmlink_packets_total",
            "Gesamtanzahl uebertragener Pakete",
        ))?;
        registry.register(Box::new(pakete_total.clone()))?;

        let frames_total = IntCounter::with_opts(Opts::new(
            "tdmlink_frames_total",
            "Gesamtanzahl uebertragener Frames",
        ))?;
        registry.register(Box::new(frames_total.clone()))?;

        let verworfene_pakete_total = IntCounter::with_opts(Opts::new(
            "tdmlink_dropped_packets_total",
            "Nach einem Stream-Laengen-Konflikt verworfene Pakete",
        ))?;
        registry.register(Box::new(verworfene_pakete_total.clone()))?;

        let framing_fehler_total = IntCounterVec::new(
            Opts::new(
                "tdmlink_framing_errors_total",
                "Frames mit falschem Sync-Bit",
            ),
            &["user"],
        )?;
        registry.register(Box::new(framing_fehler_total.clone()))?;

        let nutzer_beendet_total = IntCounter::with_opts(Opts::new(
            "tdmlink_users_finished_total",
            "Nutzer-Streams, die den aktiven Satz verlassen haben",
        ))?;
        registry.register(Box::new(nutzer_beendet_total.clone()))?;

        let mse = GaugeVec::new(
            Opts::new("tdmlink_mse", "Mittlerer quadratischer Fehler je Stufe"),
            &["user", "stage"],
        )?;
        registry.register(Box::new(mse.clone()))?;

        let verlust_rate = Histogram::with_opts(
            HistogramOpts::new(
                "tdmlink_sample_loss_ratio",
                "Anteil verlorener Samples pro Nutzer (0.0 bis 1.0)",
            )
            .buckets(vec![0.0, 0.001, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0]),
        )?;
        registry.register(Box::new(verlust_rate.clone()))?;

        let laufzeit_sekunden = Histogram::with_opts(
            HistogramOpts::new(
                "tdmlink_run_duration_seconds",
                "Dauer eines Link-Laufs in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(laufzeit_sekunden.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            pakete_total,
            frames_total,
            verworfene_pakete_total,
            framing_fehler_total,
            nutzer_beendet_total,
            mse,
            verlust_rate,
            laufzeit_sekunden,
        })
    }

    /// Setzt den MSE eines Nutzers fuer eine Stufe
    pub fn mse_setzen(&self, user: &str, stufe: MseStufe, wert: f64) {
        self.mse.with_label_values(&[user, stufe.label()]).set(wert);
    }

    /// Zaehlt Framing-Fehler eines Nutzers
    pub fn framing_fehler_zaehlen(&self, user: &str, anzahl: u64) {
        self.framing_fehler_total
            .with_label_values(&[user])
            .inc_by(anzahl);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
