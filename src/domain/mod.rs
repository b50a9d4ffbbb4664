//! Domain types for the airscribe pipeline.
//!
//! This module contains the core data structures:
//! - AudioUnit: one input recording and its channel key
//! - SpendRecord: the persisted daily spend ledger state
//! - CircuitState: the one-way breaker flag
//! - Transcription: normalized gateway results

pub mod circuit;
pub mod spend;
pub mod transcript;
pub mod unit;

// Re-export commonly used types
pub use circuit::{CircuitState, TripReason};
pub use spend::SpendRecord;
pub use transcript::Transcription;
pub use unit::{channel_key, extract_frequency_mhz, has_audio_extension, AudioUnit};
