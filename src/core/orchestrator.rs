//! Pipeline orchestrator: one pass over newly arrived recordings.
//!
//! Drives the per-file state machine
//! `CLASSIFYING → {DISCARDING | RESERVING → CALLING → COMMITTING →
//! STORING}` and owns the one-way circuit breaker. Relocating the
//! source file is always the LAST step for a unit, so a crash earlier
//! in the sequence only causes a harmless re-processing attempt on
//! restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{error, info, instrument, warn};

use crate::adapters::{GatewayError, Notifier, TranscriptionGateway};
use crate::config::Config;
use crate::domain::{AudioUnit, CircuitState, TripReason};
use crate::ingest::{Scanner, ScannerConfig};

use super::classifier::{self, ClassifierConfig, Verdict};
use super::ledger::{Commit, Reservation, SpendLedger};
use super::transcript::TranscriptStore;

/// Everything the pipeline needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub processed_dir: PathBuf,
    pub discarded_dir: PathBuf,
    pub per_file_estimate_usd: f64,
    pub idle_sleep: Duration,
    pub classifier: ClassifierConfig,
    pub scanner: ScannerConfig,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            processed_dir: config.processed_dir(),
            discarded_dir: config.discarded_dir(),
            per_file_estimate_usd: config.per_file_estimate_usd,
            idle_sleep: config.idle_sleep(),
            classifier: ClassifierConfig {
                threshold_db: config.vad_threshold_db,
                min_speech_ratio: config.min_speech_ratio,
                min_duration_secs: config.min_duration_secs,
            },
            scanner: ScannerConfig {
                input_dir: config.input_dir.clone(),
                extensions: config.extensions.clone(),
                settle: Duration::from_secs(config.settle_secs),
                max_batch: config.max_batch,
            },
        }
    }
}

/// Terminal handling applied to one unit during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Transcribed, stored and relocated
    Transcribed,

    /// Filtered out (VAD discard or provider input rejection)
    Discarded,

    /// Left in place for the next pass (transient failure)
    Deferred,

    /// The circuit tripped while handling this unit
    Tripped,
}

/// Counters for one pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassSummary {
    pub scanned: usize,
    pub transcribed: usize,
    pub discarded: usize,
    pub deferred: usize,
}

/// Main pipeline orchestrator. Single-threaded by design: one unit at
/// a time, strictly serialized cost accounting.
pub struct Orchestrator {
    settings: PipelineSettings,
    scanner: Scanner,
    ledger: SpendLedger,
    transcripts: TranscriptStore,
    gateway: Arc<dyn TranscriptionGateway>,
    notifier: Arc<dyn Notifier>,
    circuit: CircuitState,
}

impl Orchestrator {
    pub fn new(
        settings: PipelineSettings,
        ledger: SpendLedger,
        transcripts: TranscriptStore,
        gateway: Arc<dyn TranscriptionGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let scanner = Scanner::new(settings.scanner.clone());
        Self {
            settings,
            scanner,
            ledger,
            transcripts,
            gateway,
            notifier,
            circuit: CircuitState::Open,
        }
    }

    pub fn circuit(&self) -> &CircuitState {
        &self.circuit
    }

    /// Re-derive the breaker from persisted state. A process that boots
    /// at or over the ceiling must refuse normal operation outright.
    pub async fn boot_check(&mut self) -> Result<bool> {
        let record = self.ledger.current()?;
        if record.at_ceiling() {
            self.trip(TripReason::AlreadyAtCeiling {
                total: record.accumulated_cost,
                limit: record.limit,
            })
            .await;
            return Ok(true);
        }
        info!(
            spent_usd = record.accumulated_cost,
            limit_usd = record.limit,
            "Boot check passed"
        );
        Ok(false)
    }

    /// Run until the circuit trips. Only an external stop signal ends
    /// this loop otherwise; the caller races it against one.
    pub async fn run(&mut self) -> Result<TripReason> {
        if !self.boot_check().await? {
            loop {
                let summary = self.run_pass().await?;
                if self.circuit.is_tripped() {
                    break;
                }
                if summary.scanned == 0 {
                    tokio::time::sleep(self.settings.idle_sleep).await;
                }
            }
        }

        match &self.circuit {
            CircuitState::Tripped(reason) => Ok(reason.clone()),
            CircuitState::Open => unreachable!("run loop only exits tripped"),
        }
    }

    /// One pass: drain the current batch of settled files.
    pub async fn run_pass(&mut self) -> Result<PassSummary> {
        let units = self.scanner.scan().await?;
        let mut summary = PassSummary {
            scanned: units.len(),
            ..Default::default()
        };

        for unit in units {
            if self.circuit.is_tripped() {
                break;
            }
            match self.process_unit(&unit).await? {
                UnitOutcome::Transcribed => summary.transcribed += 1,
                UnitOutcome::Discarded => summary.discarded += 1,
                UnitOutcome::Deferred => summary.deferred += 1,
                UnitOutcome::Tripped => {}
            }
        }

        if summary.scanned > 0 {
            info!(
                scanned = summary.scanned,
                transcribed = summary.transcribed,
                discarded = summary.discarded,
                deferred = summary.deferred,
                "Pass complete"
            );
        }
        Ok(summary)
    }

    /// Drive one unit through the state machine.
    #[instrument(skip(self, unit), fields(file = %unit.file_name))]
    async fn process_unit(&mut self, unit: &AudioUnit) -> Result<UnitOutcome> {
        // CLASSIFYING — pure CPU work, off the reactor
        let path = unit.path.clone();
        let classifier_config = self.settings.classifier;
        let classification = tokio::task::spawn_blocking(move || {
            classifier::classify_file(&path, &classifier_config)
        })
        .await
        .context("classifier task panicked")?;

        if classification.verdict == Verdict::Discard {
            info!(
                reason = classification.reason.as_deref().unwrap_or("unknown"),
                speech_ratio = classification.speech_ratio,
                "Discarding recording"
            );
            let bucket = self.settings.discarded_dir.clone();
            self.relocate(unit, &bucket).await?;
            return Ok(UnitOutcome::Discarded);
        }

        info!(
            speech_ratio = classification.speech_ratio,
            duration_secs = classification.duration_secs,
            channel = %unit.channel,
            "Keeping recording"
        );

        // RESERVING — conservative worst-case estimate before the call
        let estimate = self.settings.per_file_estimate_usd;
        if self.ledger.reserve(estimate)? == Reservation::Denied {
            let record = self.ledger.current()?;
            self.trip(TripReason::ReserveDenied {
                total: record.accumulated_cost,
                estimate,
                limit: record.limit,
            })
            .await;
            return Ok(UnitOutcome::Tripped);
        }

        // CALLING
        let transcription = match self
            .gateway
            .transcribe(unit, classification.duration_secs)
            .await
        {
            Ok(t) => t,
            Err(GatewayError::Transient(detail)) => {
                warn!(detail, "Transient failure, leaving file for next pass");
                return Ok(UnitOutcome::Deferred);
            }
            Err(GatewayError::InvalidInput(detail)) => {
                warn!(detail, "Provider rejected input, discarding");
                let bucket = self.settings.discarded_dir.clone();
                self.relocate(unit, &bucket).await?;
                return Ok(UnitOutcome::Discarded);
            }
            Err(GatewayError::QuotaOrAuth(detail)) => {
                error!(detail, "Provider refused quota or credentials");
                self.trip(TripReason::ProviderRefused(detail)).await;
                return Ok(UnitOutcome::Tripped);
            }
        };

        // COMMITTING — the call happened, its cost is real either way
        let commit = self.ledger.commit(transcription.cost)?;

        // STORING
        if transcription.is_unintelligible() {
            info!("Transcript unintelligible, nothing stored");
        } else {
            let stored = self
                .transcripts
                .append(unit, &transcription, classification.duration_secs)
                .await?;
            info!(path = %stored.display(), "Transcript stored");
        }

        if transcription.emergency {
            warn!(channel = %unit.channel, "Emergency content detected");
            let message = format!(
                "🚨 Emergency traffic on {}: {}",
                unit.channel,
                truncate(&transcription.text, 500)
            );
            self.notifier.notify(&message).await;
        }

        // Relocation is the last step: a crash before this line means a
        // bounded duplicate charge on restart, never lost audio.
        let bucket = self.settings.processed_dir.clone();
        self.relocate(unit, &bucket).await?;

        if let Commit::CeilingExceeded(total) = commit {
            let record = self.ledger.current()?;
            self.trip(TripReason::CeilingReached {
                total,
                limit: record.limit,
            })
            .await;
        }

        Ok(UnitOutcome::Transcribed)
    }

    /// One-way trip: flip the breaker and send the single breaker alert.
    async fn trip(&mut self, reason: TripReason) {
        if self.circuit.is_tripped() {
            return;
        }
        error!(%reason, "Circuit breaker tripped, stopping");
        self.circuit.trip(reason.clone());
        self.notifier
            .notify(&format!("🚫 Transcription pipeline stopped: {reason}"))
            .await;
    }

    /// Move a unit into a date-partitioned bucket. Falls back to
    /// copy-and-delete when the buckets live on a different filesystem
    /// than the input directory.
    async fn relocate(&self, unit: &AudioUnit, bucket: &Path) -> Result<()> {
        let day_dir = bucket.join(Local::now().format("%Y-%m-%d").to_string());
        tokio::fs::create_dir_all(&day_dir)
            .await
            .with_context(|| format!("Failed to create bucket: {}", day_dir.display()))?;

        let dest = day_dir.join(&unit.file_name);
        if tokio::fs::rename(&unit.path, &dest).await.is_err() {
            tokio::fs::copy(&unit.path, &dest)
                .await
                .with_context(|| format!("Failed to copy {} to bucket", unit.file_name))?;
            tokio::fs::remove_file(&unit.path)
                .await
                .with_context(|| format!("Failed to remove {} after copy", unit.file_name))?;
        }

        info!(dest = %dest.display(), "Relocated recording");
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
