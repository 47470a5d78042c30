//! Best-effort operator webhook.
//!
//! Notifications are fire-and-forget: dispatched on a background task
//! with their own timeout, never blocking the decision path. Delivery
//! failures are logged and dropped.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::classify::Classified;

/// Sends JSON notifications to the configured operator webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Create a notifier for the given URL with a dispatch timeout.
    pub fn new(url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout: Duration::from_millis(timeout_ms.max(1)),
        }
    }

    /// Dispatch an `llm_error` notification. Returns immediately.
    pub fn notify_llm_error(&self, classified: Classified, message: &str, will_pause: bool) {
        self.dispatch(llm_error_payload(classified, message, will_pause));
    }

    /// Post a payload on a background task.
    fn dispatch(&self, payload: serde_json::Value) {
        let client = self.client.clone();
        let url = self.url.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .timeout(timeout)
                .json(&payload)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(%url, "webhook delivered");
                }
                Ok(response) => {
                    warn!(%url, status = %response.status(), "webhook rejected");
                }
                Err(e) => {
                    warn!(%url, error = %e, "webhook dispatch failed");
                }
            }
        });
    }
}

/// The wire shape of an `llm_error` notification.
fn llm_error_payload(
    classified: Classified,
    message: &str,
    will_pause: bool,
) -> serde_json::Value {
    json!({
        "type": "llm_error",
        "error": {
            "code": classified.code.as_str(),
            "severity": classified.severity,
            "message": message,
        },
        "simulation": {
            "willPause": will_pause,
        },
    })
}
