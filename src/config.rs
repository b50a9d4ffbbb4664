//! Configuration for the airscribe pipeline.
//!
//! Every operator option is available both as a CLI flag and as an
//! `AIRSCRIBE_*` environment variable. There is no config file: the
//! process is meant to run under a supervisor with a fixed environment.
//!
//! Directory layout under the work directory:
//! - `state/`        persisted spend ledger + lock file
//! - `transcripts/`  append-only transcripts, partitioned by date
//! - `processed/`    relocated audio after successful handling
//! - `discarded/`    relocated audio that was filtered out

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

/// airscribe - unattended airband transcription with a daily spend ceiling
#[derive(Parser, Debug, Clone)]
#[command(name = "airscribe")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Directory the capture process drops audio files into
    #[arg(long, env = "AIRSCRIBE_INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Root directory for state, transcripts and relocated audio
    /// (defaults to ~/.airscribe)
    #[arg(long, env = "AIRSCRIBE_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// API key for the transcription service
    #[arg(long, env = "AIRSCRIBE_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Transcription endpoint URL
    #[arg(
        long,
        env = "AIRSCRIBE_API_URL",
        default_value = "https://api.openai.com/v1/audio/transcriptions"
    )]
    pub api_url: String,

    /// Transcription model name
    #[arg(long, env = "AIRSCRIBE_MODEL", default_value = "whisper-1")]
    pub model: String,

    /// Webhook URL for emergency and circuit-breaker alerts (optional)
    #[arg(long, env = "AIRSCRIBE_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Daily spend ceiling in USD
    #[arg(long, env = "AIRSCRIBE_DAILY_LIMIT", default_value = "3.0")]
    pub daily_limit_usd: f64,

    /// Price per transcribed audio minute in USD
    #[arg(long, env = "AIRSCRIBE_PRICE_PER_MINUTE", default_value = "0.006")]
    pub price_per_minute_usd: f64,

    /// Worst-case cost estimate for a single file, used by the reserve
    /// check before the actual cost is known
    #[arg(long, env = "AIRSCRIBE_COST_ESTIMATE", default_value = "0.02")]
    pub per_file_estimate_usd: f64,

    /// VAD energy threshold in dBFS; frames at or above count as speech
    #[arg(long, env = "AIRSCRIBE_VAD_THRESHOLD_DB", default_value = "-40.0")]
    pub vad_threshold_db: f32,

    /// Minimum fraction of speech frames required to keep a recording
    #[arg(long, env = "AIRSCRIBE_MIN_SPEECH_RATIO", default_value = "0.05")]
    pub min_speech_ratio: f32,

    /// Recordings shorter than this are discarded outright (seconds)
    #[arg(long, env = "AIRSCRIBE_MIN_DURATION_SECS", default_value = "5.0")]
    pub min_duration_secs: f64,

    /// Network timeout for one transcription call (seconds)
    #[arg(long, env = "AIRSCRIBE_TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,

    /// A file must be this many seconds old before it is picked up,
    /// so half-written captures are never read
    #[arg(long, env = "AIRSCRIBE_SETTLE_SECS", default_value = "2")]
    pub settle_secs: u64,

    /// Maximum files handled in one pass
    #[arg(long, env = "AIRSCRIBE_MAX_BATCH", default_value = "25")]
    pub max_batch: usize,

    /// Sleep between passes when the input directory is empty (seconds)
    #[arg(long, env = "AIRSCRIBE_IDLE_SECS", default_value = "1")]
    pub idle_secs: u64,

    /// Audio extensions to pick up (comma-separated)
    #[arg(
        long,
        env = "AIRSCRIBE_EXTENSIONS",
        value_delimiter = ',',
        default_value = "wav"
    )]
    pub extensions: Vec<String>,
}

impl Config {
    /// Resolved work directory root.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".airscribe")
        })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.work_dir().join("state")
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.work_dir().join("transcripts")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.work_dir().join("processed")
    }

    pub fn discarded_dir(&self) -> PathBuf {
        self.work_dir().join("discarded")
    }

    /// Path of the canonical spend ledger state file.
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir().join("daily_spend.json")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    /// Reject configurations the pipeline cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("API key must not be empty");
        }
        if !self.daily_limit_usd.is_finite() || self.daily_limit_usd <= 0.0 {
            anyhow::bail!("daily limit must be a positive amount");
        }
        if !self.per_file_estimate_usd.is_finite() || self.per_file_estimate_usd <= 0.0 {
            anyhow::bail!("per-file cost estimate must be a positive amount");
        }
        if !self.price_per_minute_usd.is_finite() || self.price_per_minute_usd < 0.0 {
            anyhow::bail!("price per minute must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.min_speech_ratio) {
            anyhow::bail!("minimum speech ratio must be between 0 and 1");
        }
        if self.max_batch == 0 {
            anyhow::bail!("max batch must be at least 1");
        }
        if self.extensions.is_empty() {
            anyhow::bail!("at least one audio extension is required");
        }
        Ok(())
    }

    /// Create every directory the pipeline writes to.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.input_dir.clone(),
            self.state_dir(),
            self.transcripts_dir(),
            self.processed_dir(),
            self.discarded_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
