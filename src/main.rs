//! airscribe daemon entrypoint.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use airscribe::adapters::whisper::WhisperConfig;
use airscribe::adapters::{NoopNotifier, Notifier, WebhookNotifier, WhisperGateway};
use airscribe::core::LedgerError;
use airscribe::{
    Config, Orchestrator, PipelineSettings, SpendLedger, TranscriptStore, EXIT_CONFIG, EXIT_OK,
    EXIT_STATE, EXIT_TRIPPED,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::parse();
    ExitCode::from(run(config).await as u8)
}

async fn run(config: Config) -> i32 {
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return EXIT_CONFIG;
    }
    if let Err(e) = config.ensure_directories() {
        error!(error = %e, "Failed to prepare directories");
        return EXIT_CONFIG;
    }

    let ledger = match SpendLedger::open(&config.ledger_path(), config.daily_limit_usd) {
        Ok(ledger) => ledger,
        Err(e @ (LedgerError::Corrupt { .. } | LedgerError::AlreadyLocked(_))) => {
            error!(error = %e, "Refusing to start");
            return EXIT_STATE;
        }
        Err(e) => {
            error!(error = %e, "Failed to open spend ledger");
            return EXIT_STATE;
        }
    };

    let gateway = match WhisperGateway::new(WhisperConfig {
        api_url: config.api_url.clone(),
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        price_per_minute_usd: config.price_per_minute_usd,
        timeout: config.timeout(),
    }) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!(error = %e, "Failed to build transcription client");
            return EXIT_CONFIG;
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(NoopNotifier),
    };

    let transcripts = TranscriptStore::new(config.transcripts_dir());
    let settings = PipelineSettings::from_config(&config);

    info!(
        input = %config.input_dir.display(),
        work = %config.work_dir().display(),
        limit_usd = config.daily_limit_usd,
        "Pipeline starting"
    );

    let mut orchestrator = Orchestrator::new(settings, ledger, transcripts, gateway, notifier);

    tokio::select! {
        result = orchestrator.run() => match result {
            Ok(reason) => {
                error!(%reason, "Exiting via circuit breaker");
                EXIT_TRIPPED
            }
            Err(e) => {
                // Generic runtime failure: supervisor may restart
                error!(error = %e, "Pipeline failed");
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Stop signal received, shutting down");
            EXIT_OK
        }
    }
}
