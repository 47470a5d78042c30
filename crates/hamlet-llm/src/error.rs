//! LLM error types and the failure taxonomy.

use serde::Serialize;

/// Errors raised by the LLM gateway and its callers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The gateway is missing its model or API key.
    #[error("llm gateway not configured: {reason}")]
    NotConfigured {
        /// What is missing.
        reason: String,
    },

    /// The model string did not parse.
    #[error("invalid model string {raw:?} (expected provider[/subtype]/modelId)")]
    InvalidModel {
        /// The rejected model string.
        raw: String,
    },

    /// The HTTP call failed or the provider returned an error status.
    #[error("llm backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// The response text could not be parsed into the expected shape.
    #[error("llm response invalid: {message}")]
    InvalidResponse {
        /// Description of the parse failure.
        message: String,
    },

    /// A prompt template failed to load or render.
    #[error("template error: {message}")]
    Template {
        /// Description of the template failure.
        message: String,
    },

    /// The request exceeded its deadline.
    #[error("llm request timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },
}

/// Taxonomy codes for classified LLM failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LlmErrorCode {
    /// Provider signalled rate limiting.
    #[serde(rename = "LLM_RATE_LIMIT")]
    RateLimit,
    /// RPC timeout.
    #[serde(rename = "LLM_TIMEOUT")]
    Timeout,
    /// Connectivity failure.
    #[serde(rename = "LLM_NETWORK_ERROR")]
    NetworkError,
    /// The gateway was used before configuration.
    #[serde(rename = "LLM_NOT_INITIALIZED")]
    NotInitialized,
    /// Structured output failed validation.
    #[serde(rename = "LLM_INVALID_RESPONSE")]
    InvalidResponse,
    /// Authentication, authorisation, or quota failure.
    #[serde(rename = "LLM_API_ERROR")]
    ApiError,
    /// Anything unclassified.
    #[serde(rename = "LLM_UNKNOWN_ERROR")]
    UnknownError,
}

impl LlmErrorCode {
    /// The wire identifier of this code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "LLM_RATE_LIMIT",
            Self::Timeout => "LLM_TIMEOUT",
            Self::NetworkError => "LLM_NETWORK_ERROR",
            Self::NotInitialized => "LLM_NOT_INITIALIZED",
            Self::InvalidResponse => "LLM_INVALID_RESPONSE",
            Self::ApiError => "LLM_API_ERROR",
            Self::UnknownError => "LLM_UNKNOWN_ERROR",
        }
    }
}

impl core::fmt::Display for LlmErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a classified failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Transient; retry later.
    Warning,
    /// A real failure, but the engine keeps running.
    Error,
    /// The engine should pause when policy says so.
    Critical,
}
