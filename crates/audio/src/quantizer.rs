//! Gleichfoermige Quantisierung
//!
//! Die Stufen sind aufsteigende Entscheidungsschwellen im Abstand
//! `delta = (max - min) / stufen`, die i-te Schwelle liegt bei `(i + 1) * delta`
//! (gemessen ab 0, nicht ab `min`). Ein Sample wird per Binaersuche einer
//! Schwelle zugeordnet und dann auf die naehere der beiden Nachbarschwellen
//! gerundet.
//!
//! ## Fehlerbilanz
//! Jeder Sample traegt `(x - q)^2` zur Summe bei, auch wenn er auf die
//! erste oder letzte Schwelle geklemmt wird.

use crate::error::{AudioError, AudioResult};

// ---------------------------------------------------------------------------
// QuantizationLevels
// ---------------------------------------------------------------------------

/// Aufsteigende Entscheidungsschwellen (mindestens eine)
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizationLevels {
    schwellen: Vec<f64>,
}

impl QuantizationLevels {
    /// Alle Schwellen als Slice
    pub fn as_slice(&self) -> &[f64] {
        &self.schwellen
    }

    /// Anzahl der Schwellen
    pub fn len(&self) -> usize {
        self.schwellen.len()
    }

    /// Immer false – leere Stufen lassen sich nicht konstruieren
    pub fn is_empty(&self) -> bool {
        self.schwellen.is_empty()
    }

    /// Kleinste Schwelle
    pub fn first(&self) -> f64 {
        self.schwellen[0]
    }

    /// Groesste Schwelle
    pub fn last(&self) -> f64 {
        self.schwellen[self.schwellen.len() - 1]
    }

    /// Schwelle an Index `i`
    pub fn get(&self, i: usize) -> Option<f64> {
        self.schwellen.get(i).copied()
    }
}

/// Baut `levels` aufsteigende Schwellen fuer den Bereich `min..max`
///
/// # Fehler
/// - `AudioError::DegenerateRange` wenn `max <= min`
/// - `AudioError::InvalidLevelCount` wenn `levels == 0`
/// - `AudioError::NonFinite` bei NaN/Inf-Grenzen
pub fn build_levels(min: f64, max: f64, levels: usize) -> AudioResult<QuantizationLevels> {
    if !min.is_finite() {
        return Err(AudioError::NonFinite(min));
    }
    if !max.is_finite() {
        return Err(AudioError::NonFinite(max));
    }
    if levels == 0 {
        return Err(AudioError::InvalidLevelCount(levels));
    }
    // max < min wuerde absteigende Schwellen liefern
    if max <= min {
        return Err(AudioError::DegenerateRange { min, max });
    }

    let delta = (max - min) / levels as f64;
    let schwellen = (0..levels).map(|i| (i + 1) as f64 * delta).collect();

    Ok(QuantizationLevels { schwellen })
}

/// Binaersuche nach dem Entscheidungsindex
///
/// - `value >= last` -> letzter Index
/// - `value <= first` -> 0
/// - exakter Treffer auf die Mittelschwelle -> deren Index
/// - sonst Abstieg in die passende Haelfte, bis ein Element uebrig ist
///
/// Fuer innere Werte ergibt das den Floor-Index (groesste Schwelle <= value).
pub fn nearest_level_index(levels: &QuantizationLevels, value: f64) -> usize {
    let schwellen = levels.as_slice();
    let n = schwellen.len();

    if value >= schwellen[n - 1] {
        return n - 1;
    }
    if value <= schwellen[0] {
        return 0;
    }

    // Fenster [lo, hi) mit schwellen[lo] <= value < schwellen[hi]
    let mut lo = 0usize;
    let mut hi = n;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let mitte = schwellen[mid];
        if value == mitte {
            return mid;
        }
        if value < mitte {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}

// ---------------------------------------------------------------------------
// Quantisierung
// ---------------------------------------------------------------------------

/// Ergebnis fuer einen einzelnen Sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// Index der gewaehlten Schwelle
    pub index: usize,
    /// Quantisierter Wert
    pub value: f64,
    /// Quadratischer Fehler `(x - value)^2`
    pub squared_error: f64,
}

/// Quantisiert einen einzelnen Sample
pub fn quantize_sample(levels: &QuantizationLevels, sample: f64) -> AudioResult<Snap> {
    if !sample.is_finite() {
        return Err(AudioError::NonFinite(sample));
    }

    let schwellen = levels.as_slice();
    let idx = nearest_level_index(levels, sample);

    let index = if idx == 0 || idx == schwellen.len() - 1 {
        idx
    } else {
        let diff_unten = (sample - schwellen[idx]).abs();
        let diff_oben = (sample - schwellen[idx + 1]).abs();
        // Gleichstand -> obere Stufe
        if diff_oben > diff_unten {
            idx
        } else {
            idx + 1
        }
    };

    let value = schwellen[index];
    Ok(Snap {
        index,
        value,
        squared_error: (sample - value).powi(2),
    })
}

/// Ergebnis einer Batch-Quantisierung
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quantized {
    /// Quantisierte Werte
    pub values: Vec<f64>,
    /// Gewaehlte Schwellen-Indizes
    pub indices: Vec<usize>,
    /// Summe der quadratischen Fehler
    pub squared_error_sum: f64,
}

impl Quantized {
    /// Mittlerer quadratischer Fehler (0 bei leerer Eingabe)
    pub fn mean_squared_error(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.squared_error_sum / self.values.len() as f64
        }
    }
}

/// Quantisiert eine Sample-Folge
pub fn quantize(samples: &[f64], levels: &QuantizationLevels) -> AudioResult<Quantized> {
    let mut ergebnis = Quantized {
        values: Vec::with_capacity(samples.len()),
        indices: Vec::with_capacity(samples.len()),
        squared_error_sum: 0.0,
    };

    for &sample in samples {
        let snap = quantize_sample(levels, sample)?;
        ergebnis.values.push(snap.value);
        ergebnis.indices.push(snap.index);
        ergebnis.squared_error_sum += snap.squared_error;
    }

    tracing::trace!(
        samples = samples.len(),
        stufen = levels.len(),
        fehler = ergebnis.squared_error_sum,
        "Quantisierung abgeschlossen"
    );

    Ok(ergebnis)
}
