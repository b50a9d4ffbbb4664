//! Best-effort alert delivery over a webhook.
//!
//! A single JSON POST with a short human-readable message. Delivery
//! failure is logged and swallowed; nothing in the pipeline ever fails
//! because an alert could not be sent.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::Notifier;

/// How long one alert POST may take before it is abandoned
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Discord-style webhook notifier.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        let payload = serde_json::json!({ "content": message });

        let result = self
            .client
            .post(&self.url)
            .timeout(NOTIFY_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Alert delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Alert webhook rejected the message");
            }
            Err(e) => {
                warn!(error = %e, "Alert webhook unreachable");
            }
        }
    }
}

/// Notifier used when no webhook is configured; alerts only hit the log.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: &str) {
        info!(message, "Alert (no webhook configured)");
    }
}
