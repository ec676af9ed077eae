//! tdmlink-audio – Sample-Verarbeitung vor dem Multiplexen
//!
//! - Gleichfoermige Quantisierung mit Entscheidungsschwellen
//! - Kompandierung nach A-Law und µ-Law inkl. Expansion
//! - Fehleranalyse (uniform vs. kompandiert, mehrere Koeffizienten)
//! - Testsignal-Erzeugung als Ersatz fuer WAV-Eingaben, Verstaerkung in dB

pub mod analysis;
pub mod compander;
pub mod error;
pub mod quantizer;
pub mod signal;

// Bequeme Re-Exporte der wichtigsten Typen
pub use analysis::{fehler_analysieren, AnalyseConfig, FehlerAnalyse, KennlinienFehler};
pub use compander::{Companded, Compander};
pub use error::{AudioError, AudioResult};
pub use quantizer::{
    build_levels, nearest_level_index, quantize, quantize_sample, QuantizationLevels, Quantized,
    Snap,
};
pub use signal::{kuerzen, normalisieren, ton_erzeugen, verstaerken, Ton};
