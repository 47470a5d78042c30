//! Error classification and the consecutive-failure monitor.
//!
//! Any raised error message maps to a `(code, severity)` pair by
//! substring match, in priority order. The [`ErrorMonitor`] counts
//! consecutive failures, requests an engine pause when policy says so
//! (critical severity, or the failure ceiling), and fires the
//! operator webhook best-effort.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{LlmErrorCode, Severity};
use crate::webhook::WebhookNotifier;

/// A classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    /// Taxonomy code.
    pub code: LlmErrorCode,
    /// Severity tier.
    pub severity: Severity,
}

/// Map an error message to its taxonomy entry.
///
/// Matching is case-insensitive substring search, first hit wins, in
/// the table's priority order.
pub fn classify(message: &str) -> Classified {
    let lower = message.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if contains_any(&["rate limit", "429", "too many requests"]) {
        return Classified {
            code: LlmErrorCode::RateLimit,
            severity: Severity::Warning,
        };
    }
    if contains_any(&["timeout", "timed out", "etimedout"]) {
        return Classified {
            code: LlmErrorCode::Timeout,
            severity: Severity::Error,
        };
    }
    if contains_any(&["network", "econnrefused", "enotfound", "fetch failed"]) {
        return Classified {
            code: LlmErrorCode::NetworkError,
            severity: Severity::Error,
        };
    }
    if contains_any(&["not initialized", "not configured"]) {
        return Classified {
            code: LlmErrorCode::NotInitialized,
            severity: Severity::Critical,
        };
    }
    if contains_any(&["invalid", "parse", "schema"]) {
        return Classified {
            code: LlmErrorCode::InvalidResponse,
            severity: Severity::Warning,
        };
    }
    if contains_any(&["401", "403", "unauthorized", "forbidden", "quota"]) {
        return Classified {
            code: LlmErrorCode::ApiError,
            severity: Severity::Critical,
        };
    }
    Classified {
        code: LlmErrorCode::UnknownError,
        severity: Severity::Error,
    }
}

/// Pause policy settings for the monitor.
#[derive(Debug, Clone, Copy)]
pub struct MonitorPolicy {
    /// Whether critical errors (or the failure ceiling) pause the
    /// engine.
    pub pause_on_critical_error: bool,
    /// Consecutive failures before a pause is requested.
    pub max_consecutive_failures: u32,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            pause_on_critical_error: true,
            max_consecutive_failures: 3,
        }
    }
}

/// Tracks consecutive failures and drives the pause/webhook policy.
pub struct ErrorMonitor {
    policy: MonitorPolicy,
    consecutive_failures: AtomicU32,
    /// The engine's pause-request flag.
    pause_signal: Arc<AtomicBool>,
    webhook: Option<WebhookNotifier>,
}

impl ErrorMonitor {
    /// Create a monitor wired to the engine's pause signal.
    pub const fn new(
        policy: MonitorPolicy,
        pause_signal: Arc<AtomicBool>,
        webhook: Option<WebhookNotifier>,
    ) -> Self {
        Self {
            policy,
            consecutive_failures: AtomicU32::new(0),
            pause_signal,
            webhook,
        }
    }

    /// Record a failed LLM call. Classifies the message, bumps the
    /// counter, applies the pause policy, and fires the webhook.
    pub fn record_failure(&self, message: &str) -> Classified {
        let classified = classify(message);
        let failures = self
            .consecutive_failures
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);

        let ceiling_hit = failures >= self.policy.max_consecutive_failures;
        let will_pause = self.policy.pause_on_critical_error
            && (classified.severity == Severity::Critical || ceiling_hit);

        warn!(
            code = %classified.code,
            severity = ?classified.severity,
            failures,
            will_pause,
            message,
            "LLM call failed"
        );

        if will_pause {
            self.pause_signal.store(true, Ordering::Release);
        }
        if let Some(webhook) = self.webhook.as_ref() {
            webhook.notify_llm_error(classified, message, will_pause);
        }

        classified
    }

    /// Record a successful LLM call; resets the failure counter.
    pub fn record_success(&self) {
        let previous = self.consecutive_failures.swap(0, Ordering::AcqRel);
        if previous > 0 {
            debug!(previous, "LLM recovered, failure counter reset");
        }
    }

    /// Current consecutive failure count (diagnostics).
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }
}
