//! tdmlink-voice – TDM-Engine
//!
//! Rahmt kompandierte und quantisierte Samples mit einem Sync-Bit, verschachtelt
//! sie reihum zu Paketen und setzt die Nutzer-Streams auf der Gegenseite wieder
//! zusammen.
//!
//! ## Module
//! - [`sync`] – Zyklisches Sync-Muster
//! - [`frame`] – Frame Codec (Sync-Bit + Nutzdaten)
//! - [`coder`] – Sample <-> Nutzdaten-Bits (Kompander + Quantisierer)
//! - [`mux`] – Round-Robin-Multiplexer
//! - [`demux`] – Demultiplexer mit Sync-Pruefung
//! - [`telemetry`] – Bericht pro Nutzer (Fehler, MSE je Stufe)
//! - [`link`] – Sender- und Empfaenger-Task ueber einen tokio-Kanal

pub mod coder;
pub mod demux;
pub mod error;
pub mod frame;
pub mod link;
pub mod mux;
pub mod sync;
pub mod telemetry;

pub use coder::SampleCoder;
pub use demux::{DemuxOutput, Demultiplexer, ReceiveState, UserOutput};
pub use error::{FramingError, StreamLengthMismatch, VoiceError, VoiceResult};
pub use frame::{decode_frame, encode_frame, Bits, Frame, FrameCodec};
pub use link::{link_ausfuehren, Stoerung, SyncBitFlip};
pub use mux::{EncodeStats, Multiplexer, Packet};
pub use sync::SyncPattern;
pub use telemetry::{LinkReport, NutzerBericht};
