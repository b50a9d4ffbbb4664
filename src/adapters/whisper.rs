//! Transcription gateway for an OpenAI-compatible speech-to-text API.
//!
//! Wraps the single paid network call behind a typed failure taxonomy
//! the orchestrator routes on, and converts provider usage into a
//! worst-case rounded cost for the spend ledger.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::{emergency, TranscriptionGateway};
use crate::domain::{AudioUnit, Transcription};

/// Typed failures for the transcription call. Each kind maps to a
/// distinct orchestrator decision.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network trouble or a server-side error; the file is left in
    /// place and retried on a later pass. No cost was incurred.
    #[error("transient transcription failure: {0}")]
    Transient(String),

    /// The provider refuses credentials or quota. Continuing would be
    /// pointless or risk API-side surprises; the run must stop.
    #[error("provider refused quota or credentials: {0}")]
    QuotaOrAuth(String),

    /// The provider rejected the audio itself. The file is discarded.
    #[error("provider rejected input: {0}")]
    InvalidInput(String),
}

/// Successful response body from the transcriptions endpoint.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Gateway configuration, lifted straight from the operator settings.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub price_per_minute_usd: f64,
    pub timeout: Duration,
}

/// HTTP gateway to an OpenAI-compatible `audio/transcriptions` endpoint.
pub struct WhisperGateway {
    config: WhisperConfig,
    client: reqwest::Client,
}

impl WhisperGateway {
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Billed cost for a clip, rounded UP to the next cent so the
    /// ledger's accounting is never optimistic.
    pub fn cost_for_duration(&self, duration_secs: f64) -> f64 {
        cost_for_duration(duration_secs, self.config.price_per_minute_usd)
    }

    fn mime_for(unit: &AudioUnit) -> &'static str {
        match unit
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("wav") => "audio/wav",
            Some("flac") => "audio/flac",
            _ => "audio/mpeg",
        }
    }
}

/// Worst-case rounding: price accrues per second, and the total is
/// rounded up to the next cent.
pub fn cost_for_duration(duration_secs: f64, price_per_minute_usd: f64) -> f64 {
    let raw = duration_secs.max(0.0) / 60.0 * price_per_minute_usd;
    (raw * 100.0).ceil() / 100.0
}

/// Map a non-success HTTP status to a failure kind.
fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let detail = format!("{status}: {body}");
    match status.as_u16() {
        401 | 402 | 403 | 429 => GatewayError::QuotaOrAuth(detail),
        400 | 404 | 413 | 415 | 422 => GatewayError::InvalidInput(detail),
        s if s >= 500 => GatewayError::Transient(detail),
        _ => GatewayError::Transient(detail),
    }
}

#[async_trait]
impl TranscriptionGateway for WhisperGateway {
    async fn transcribe(
        &self,
        unit: &AudioUnit,
        duration_secs: f64,
    ) -> Result<Transcription, GatewayError> {
        let bytes = tokio::fs::read(&unit.path)
            .await
            .map_err(|e| GatewayError::Transient(format!("failed to read audio: {e}")))?;

        let part = Part::bytes(bytes)
            .file_name(unit.file_name.clone())
            .mime_str(Self::mime_for(unit))
            .map_err(|e| GatewayError::InvalidInput(format!("bad mime type: {e}")))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Transient(format!("request timed out: {e}"))
                } else {
                    GatewayError::Transient(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transient(format!("unparseable response: {e}")))?;

        let text = parsed.text.trim().to_string();
        Ok(Transcription {
            emergency: emergency::contains_emergency(&text),
            cost: self.cost_for_duration(duration_secs),
            text,
            completed_at: Utc::now(),
        })
    }
}
