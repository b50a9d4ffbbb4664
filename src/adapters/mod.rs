//! Adapter interfaces for external systems.
//!
//! The pipeline talks to two external collaborators: the paid
//! transcription service and the alert webhook. Both sit behind
//! object-safe traits so the orchestrator can be exercised with
//! in-process fakes.

pub mod emergency;
pub mod webhook;
pub mod whisper;

use async_trait::async_trait;

use crate::domain::{AudioUnit, Transcription};

pub use webhook::{NoopNotifier, WebhookNotifier};
pub use whisper::{GatewayError, WhisperGateway};

/// The paid transcription call, normalized to (text, cost, flag) or a
/// typed failure the orchestrator can route on.
#[async_trait]
pub trait TranscriptionGateway: Send + Sync {
    /// Transcribe one unit. `duration_secs` is the decoded duration
    /// from classification, used for worst-case cost accounting.
    async fn transcribe(
        &self,
        unit: &AudioUnit,
        duration_secs: f64,
    ) -> Result<Transcription, GatewayError>;
}

/// Fire-and-forget alert delivery. Implementations log their own
/// failures; callers never consult a result and never fail because an
/// alert could not be sent.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}
