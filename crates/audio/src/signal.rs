//! Testsignale
//!
//! Ersatz fuer WAV-Eingaben: erzeugt Sinustoene mit fester Abtastrate und
//! bietet die kleinen Array-Helfer, die vor dem Link gebraucht werden.

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, AudioResult};

/// Beschreibung eines Sinustons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ton {
    /// Frequenz in Hz
    pub frequenz_hz: f64,
    /// Dauer in Sekunden
    pub dauer_s: f64,
    /// Spitzenamplitude (0.0..=1.0)
    pub amplitude: f64,
}

impl Default for Ton {
    fn default() -> Self {
        Self {
            frequenz_hz: 400.0,
            dauer_s: 0.1,
            amplitude: 0.8,
        }
    }
}

/// Erzeugt `sin(2π f n / fs)` fuer die Dauer des Tons
pub fn ton_erzeugen(ton: &Ton, abtastrate: u32) -> AudioResult<Vec<f64>> {
    if abtastrate == 0 {
        return Err(AudioError::Signal("Abtastrate muss > 0 sein".into()));
    }
    for wert in [ton.frequenz_hz, ton.dauer_s, ton.amplitude] {
        if !wert.is_finite() {
            return Err(AudioError::NonFinite(wert));
        }
    }
    if ton.dauer_s < 0.0 {
        return Err(AudioError::Signal(format!(
            "Dauer darf nicht negativ sein (war: {})",
            ton.dauer_s
        )));
    }
    if !(0.0..=1.0).contains(&ton.amplitude) {
        return Err(AudioError::Signal(format!(
            "Amplitude muss zwischen 0 und 1 liegen (war: {})",
            ton.amplitude
        )));
    }

    let fs = abtastrate as f64;
    let anzahl = (fs * ton.dauer_s).round() as usize;
    let schritt = std::f64::consts::TAU * ton.frequenz_hz / fs;

    Ok((0..anzahl)
        .map(|n| ton.amplitude * (schritt * n as f64).sin())
        .collect())
}

/// Skaliert die Folge so, dass der Spitzenwert 1.0 betraegt
///
/// Stille (nur Nullen) bleibt unveraendert.
pub fn normalisieren(samples: &mut [f64]) {
    let spitze = samples.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if spitze > 0.0 && spitze.is_finite() {
        for s in samples.iter_mut() {
            *s /= spitze;
        }
    }
}

/// Verstaerkt die Folge um `db` Dezibel (Faktor `10^(db/20)`)
///
/// Uebersteuerung wird nicht abgeschnitten: liegt ein Ergebnis ausserhalb
/// von [-1, 1], schlaegt die Verstaerkung mit `OutOfRange` fehl.
pub fn verstaerken(samples: &[f64], db: f64) -> AudioResult<Vec<f64>> {
    if !db.is_finite() {
        return Err(AudioError::NonFinite(db));
    }
    let faktor = 10f64.powf(db / 20.0);

    samples
        .iter()
        .map(|&x| {
            let y = x * faktor;
            if !y.is_finite() {
                Err(AudioError::NonFinite(y))
            } else if y.abs() > 1.0 {
                Err(AudioError::OutOfRange(y))
            } else {
                Ok(y)
            }
        })
        .collect()
}

/// Gibt den vorderen Anteil `verhaeltnis` (0.0..=1.0) der Folge zurueck
pub fn kuerzen(samples: &[f64], verhaeltnis: f64) -> &[f64] {
    let verhaeltnis = if verhaeltnis.is_finite() {
        verhaeltnis.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let ziel = (samples.len() as f64 * verhaeltnis) as usize;
    &samples[..ziel]
}
