//! Frame Codec
//!
//! Ein Frame ist ein Sync-Bit gefolgt von den Nutzdaten eines Samples:
//!
//! ```text
//! +-----+---------------------------+
//! | S   | Nutzdaten (MSB zuerst)    |
//! +-----+---------------------------+
//!   1 Bit   nutzdaten_breite Bit
//! ```
//!
//! Das Sync-Bit ist `muster[slot mod laenge]`. Die Breite ist fuer einen
//! ganzen Lauf konstant.

use bitvec::prelude::*;
use tdmlink_core::UserId;

use crate::error::{FramingError, VoiceError, VoiceResult};
use crate::sync::SyncPattern;

/// Bitfolge, MSB zuerst
pub type Bits = BitVec<u8, Msb0>;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Ein gerahmter Sample (Sync-Bit + Nutzdaten)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bits: Bits,
}

impl Frame {
    /// Alle Bits des Frames
    pub fn bits(&self) -> &BitSlice<u8, Msb0> {
        &self.bits
    }

    /// Breite in Bit
    pub fn breite(&self) -> usize {
        self.bits.len()
    }

    /// Beobachtetes Sync-Bit
    pub fn sync_bit(&self) -> bool {
        self.bits[0]
    }

    /// Nutzdaten ohne Sync-Bit
    pub fn nutzdaten(&self) -> &BitSlice<u8, Msb0> {
        &self.bits[1..]
    }

    /// Invertiert das Sync-Bit (Kanalstoerung)
    pub fn sync_bit_kippen(&mut self) {
        let alt = self.bits[0];
        self.bits.set(0, !alt);
    }
}

/// Stellt das Musterbit fuer `slot` vor die Nutzdaten
pub fn encode_frame(muster: &SyncPattern, nutzdaten: &BitSlice<u8, Msb0>, slot: usize) -> Frame {
    let mut bits = Bits::with_capacity(1 + nutzdaten.len());
    bits.push(muster.bit(slot));
    bits.extend_from_bitslice(nutzdaten);
    Frame { bits }
}

/// Trennt Sync-Bit und Nutzdaten und prueft das Sync-Bit gegen das Muster
///
/// Gibt `(gueltig, nutzdaten)` zurueck.
pub fn decode_frame(muster: &SyncPattern, frame: &Frame, slot: usize) -> (bool, Bits) {
    let gueltig = frame.sync_bit() == muster.bit(slot);
    (gueltig, frame.nutzdaten().to_bitvec())
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Frame Codec mit fester Nutzdaten-Breite
#[derive(Debug, Clone)]
pub struct FrameCodec {
    muster: SyncPattern,
    nutzdaten_breite: usize,
}

impl FrameCodec {
    pub fn neu(muster: SyncPattern, nutzdaten_breite: usize) -> Self {
        Self {
            muster,
            nutzdaten_breite,
        }
    }

    pub fn muster(&self) -> &SyncPattern {
        &self.muster
    }

    pub fn nutzdaten_breite(&self) -> usize {
        self.nutzdaten_breite
    }

    pub fn frame_breite(&self) -> usize {
        1 + self.nutzdaten_breite
    }

    /// Rahmt Nutzdaten der konfigurierten Breite
    pub fn encode(&self, nutzdaten: &BitSlice<u8, Msb0>, slot: usize) -> VoiceResult<Frame> {
        if nutzdaten.len() != self.nutzdaten_breite {
            return Err(VoiceError::FrameWidth {
                erwartet: self.nutzdaten_breite,
                erhalten: nutzdaten.len(),
            });
        }
        Ok(encode_frame(&self.muster, nutzdaten, slot))
    }

    /// Prueft Breite und Sync-Bit; liefert die Nutzdaten
    ///
    /// # Fehler
    /// - `VoiceError::FrameWidth` bei falscher Breite (fatal)
    /// - `VoiceError::Framing` bei falschem Sync-Bit (vom Aufrufer abzufangen)
    pub fn decode(
        &self,
        frame: &Frame,
        slot: usize,
        user_id: UserId,
        paket_index: u64,
    ) -> VoiceResult<Bits> {
        if frame.breite() != self.frame_breite() {
            return Err(VoiceError::FrameWidth {
                erwartet: self.frame_breite(),
                erhalten: frame.breite(),
            });
        }

        let (gueltig, nutzdaten) = decode_frame(&self.muster, frame, slot);
        if !gueltig {
            return Err(FramingError {
                user_id,
                paket_index,
                slot_index: slot % self.muster.len(),
            }
            .into());
        }
        Ok(nutzdaten)
    }
}
