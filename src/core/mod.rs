//! Core pipeline logic.
//!
//! This module contains:
//! - Classifier: energy-based keep/discard decision
//! - SpendLedger: durable daily cost accounting with a hard ceiling
//! - TranscriptStore: append-only, date-partitioned transcript output
//! - Orchestrator: the per-file state machine and main loop

pub mod classifier;
pub mod ledger;
pub mod orchestrator;
pub mod transcript;

// Re-export commonly used types
pub use classifier::{classify_bytes, classify_file, Classification, ClassifierConfig, Verdict};
pub use ledger::{Commit, LedgerError, Reservation, SpendLedger};
pub use orchestrator::{Orchestrator, PassSummary, PipelineSettings, UnitOutcome};
pub use transcript::TranscriptStore;
