//! airscribe - unattended airband transcription pipeline
//!
//! Ingests short radio recordings dropped into a directory by an
//! external capture process, filters out silence with an energy VAD,
//! forwards the rest to a paid transcription API, and enforces a
//! crash-safe daily spend ceiling. Once the ceiling is reached the
//! process trips its circuit breaker and exits with a reserved code
//! that the supervisor must not restart from.
//!
//! # Modules
//!
//! - `adapters`: External collaborators (transcription API, webhook)
//! - `core`: Pipeline logic (Classifier, SpendLedger, Orchestrator)
//! - `domain`: Data structures (AudioUnit, SpendRecord, CircuitState)
//! - `ingest`: Input directory scanning
//! - `config`: CLI/environment configuration surface
//!
//! # Exit-code contract
//!
//! The supervisor restarts the process on transient failure but must
//! treat [`EXIT_TRIPPED`] as terminal (human intervention required).

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use adapters::{Notifier, TranscriptionGateway};
pub use config::Config;
pub use core::{Orchestrator, PipelineSettings, SpendLedger, TranscriptStore};
pub use domain::{AudioUnit, CircuitState, SpendRecord, Transcription, TripReason};

/// Normal shutdown (operator stop signal).
pub const EXIT_OK: i32 = 0;

/// Configuration problem at startup (also clap's own error code).
pub const EXIT_CONFIG: i32 = 2;

/// Persisted state problem at startup: corrupt ledger or a second
/// instance already holding the ledger lock.
pub const EXIT_STATE: i32 = 3;

/// Circuit breaker tripped. Reserved exclusively for the spend ceiling
/// and provider-refusal stops; must be excluded from the supervisor's
/// automatic-restart set.
pub const EXIT_TRIPPED: i32 = 42;
