//! The LLM gateway: one configured provider behind two operations.
//!
//! `generate_text` returns the raw completion text; `generate_object`
//! additionally parses it into a typed value (schema mismatch becomes
//! an invalid-response error, never a panic). The provider is chosen
//! by the model string `provider[/subtype]/modelId` — `openai`,
//! `anthropic`, or `google`. Enum dispatch is used because async
//! trait methods are not dyn-compatible.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::LlmError;
use crate::parse::parse_structured;

/// A prompt pair ready for a provider call.
#[derive(Debug, Clone)]
pub struct PromptParts {
    /// System message establishing the task.
    pub system: String,
    /// User message carrying the content.
    pub user: String,
}

/// The provider named by a model string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// OpenAI-compatible chat completions.
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Generative Language API.
    Google,
}

/// A parsed model string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// The provider to route to.
    pub provider: Provider,
    /// The provider-side model identifier.
    pub model_id: String,
}

impl ModelSpec {
    /// Parse `provider[/subtype]/modelId`.
    ///
    /// The optional subtype (e.g. `openai/chat/gpt-4o`) is accepted
    /// and folded away; only the provider and the final model id
    /// matter for routing.
    pub fn parse(raw: &str) -> Result<Self, LlmError> {
        let invalid = || LlmError::InvalidModel { raw: raw.to_owned() };
        let (provider_str, rest) = raw.split_once('/').ok_or_else(invalid)?;
        let provider = match provider_str {
            "openai" => Provider::OpenAi,
            "anthropic" => Provider::Anthropic,
            "google" => Provider::Google,
            _other => return Err(invalid()),
        };
        let model_id = rest.rsplit('/').next().ok_or_else(invalid)?;
        if model_id.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            provider,
            model_id: model_id.to_owned(),
        })
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Model string (`provider[/subtype]/modelId`).
    pub model: String,
    /// API key.
    pub api_key: String,
    /// Base URL override; provider default when absent.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// The configured gateway.
pub struct LlmGateway {
    backend: Backend,
    timeout: Duration,
}

/// Provider dispatch.
enum Backend {
    /// OpenAI-compatible chat completions.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
    /// Google Generative Language API.
    Google(HttpBackend),
}

/// Shared HTTP plumbing for all providers.
struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_id: String,
}

impl LlmGateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::NotConfigured`] when the API key is empty
    /// and [`LlmError::InvalidModel`] when the model string does not
    /// parse.
    pub fn new(config: &GatewayConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured {
                reason: String::from("api key is empty"),
            });
        }
        let spec = ModelSpec::parse(&config.model)?;

        let default_base = match spec.provider {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta",
        };
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base.to_owned());

        let http = HttpBackend {
            client: reqwest::Client::new(),
            base_url,
            api_key: config.api_key.clone(),
            model_id: spec.model_id,
        };

        let backend = match spec.provider {
            Provider::OpenAi => Backend::OpenAi(http),
            Provider::Anthropic => Backend::Anthropic(http),
            Provider::Google => Backend::Google(http),
        };

        Ok(Self {
            backend,
            timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
        })
    }

    /// Human-readable provider name for logging.
    pub const fn provider_name(&self) -> &'static str {
        match &self.backend {
            Backend::OpenAi(_) => "openai",
            Backend::Anthropic(_) => "anthropic",
            Backend::Google(_) => "google",
        }
    }

    /// Send a prompt and return the raw completion text.
    pub async fn generate_text(&self, prompt: &PromptParts) -> Result<String, LlmError> {
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let call = async {
            match &self.backend {
                Backend::OpenAi(http) => http.complete_openai(prompt).await,
                Backend::Anthropic(http) => http.complete_anthropic(prompt).await,
                Backend::Google(http) => http.complete_google(prompt).await,
            }
        };
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(LlmError::Timeout { timeout_ms }),
        }
    }

    /// Send a prompt and parse the completion into a typed value.
    pub async fn generate_object<T: DeserializeOwned>(
        &self,
        prompt: &PromptParts,
    ) -> Result<T, LlmError> {
        let text = self.generate_text(prompt).await?;
        debug!(provider = self.provider_name(), bytes = text.len(), "completion received");
        parse_structured(&text)
    }
}

impl HttpBackend {
    /// OpenAI-compatible chat completions call.
    async fn complete_openai(&self, prompt: &PromptParts) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model_id,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": 0.7,
            "max_tokens": 1024,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend {
                message: format!("openai request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_e| String::from("unable to read error body"));
            return Err(LlmError::Backend {
                message: format!("openai returned {status}: {error_body}"),
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| LlmError::Backend {
            message: format!("openai response parse failed: {e}"),
        })?;
        extract_openai_content(&json)
    }

    /// Anthropic Messages API call.
    async fn complete_anthropic(&self, prompt: &PromptParts) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.base_url);
        let body = serde_json::json!({
            "model": self.model_id,
            "max_tokens": 1024,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend {
                message: format!("anthropic request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_e| String::from("unable to read error body"));
            return Err(LlmError::Backend {
                message: format!("anthropic returned {status}: {error_body}"),
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| LlmError::Backend {
            message: format!("anthropic response parse failed: {e}"),
        })?;
        extract_anthropic_content(&json)
    }

    /// Google Generative Language API call.
    async fn complete_google(&self, prompt: &PromptParts) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_id, self.api_key
        );
        let body = serde_json::json!({
            "systemInstruction": {"parts": [{"text": prompt.system}]},
            "contents": [
                {"role": "user", "parts": [{"text": prompt.user}]}
            ],
            "generationConfig": {"responseMimeType": "application/json"}
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend {
                message: format!("google request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_e| String::from("unable to read error body"));
            return Err(LlmError::Backend {
                message: format!("google returned {status}: {error_body}"),
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| LlmError::Backend {
            message: format!("google response parse failed: {e}"),
        })?;
        extract_google_content(&json)
    }
}

/// Extract the text from an OpenAI chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LlmError::Backend {
            message: String::from("openai response missing choices[0].message.content"),
        })
}

/// Extract the text from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LlmError::Backend {
            message: String::from("anthropic response missing content[0].text"),
        })
}

/// Extract the text from a Google `generateContent` response.
fn extract_google_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LlmError::Backend {
            message: String::from("google response missing candidates[0].content.parts[0].text"),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn model_spec_parses_with_and_without_subtype() {
        let spec = ModelSpec::parse("openai/chat/gpt-4o-mini").unwrap();
        assert_eq!(spec.provider, Provider::OpenAi);
        assert_eq!(spec.model_id, "gpt-4o-mini");

        let spec = ModelSpec::parse("anthropic/claude-sonnet-4-5").unwrap();
        assert_eq!(spec.provider, Provider::Anthropic);
        assert_eq!(spec.model_id, "claude-sonnet-4-5");

        let spec = ModelSpec::parse("google/gemini-2.0-flash").unwrap();
        assert_eq!(spec.provider, Provider::Google);
    }

    #[test]
    fn model_spec_rejects_unknown_provider_and_bare_names() {
        assert!(ModelSpec::parse("mistral/large").is_err());
        assert!(ModelSpec::parse("gpt-4o").is_err());
        assert!(ModelSpec::parse("openai/").is_err());
    }

    #[test]
    fn gateway_requires_api_key() {
        let config = GatewayConfig {
            model: String::from("openai/chat/gpt-4o-mini"),
            api_key: String::new(),
            base_url: None,
            request_timeout_ms: 1000,
        };
        assert!(matches!(
            LlmGateway::new(&config),
            Err(LlmError::NotConfigured { .. })
        ));
    }

    #[test]
    fn gateway_routes_by_provider() {
        let config = GatewayConfig {
            model: String::from("anthropic/claude-sonnet-4-5"),
            api_key: String::from("key"),
            base_url: None,
            request_timeout_ms: 1000,
        };
        let gateway = LlmGateway::new(&config).unwrap();
        assert_eq!(gateway.provider_name(), "anthropic");
    }

    #[test]
    fn extractors_pull_provider_shapes() {
        let openai = serde_json::json!({
            "choices": [{"message": {"content": "{\"type\": \"idle\"}"}}]
        });
        assert!(extract_openai_content(&openai).unwrap().contains("idle"));

        let anthropic = serde_json::json!({
            "content": [{"type": "text", "text": "{\"type\": \"idle\"}"}]
        });
        assert!(extract_anthropic_content(&anthropic).unwrap().contains("idle"));

        let google = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"type\": \"idle\"}"}]}}]
        });
        assert!(extract_google_content(&google).unwrap().contains("idle"));
    }

    #[test]
    fn extractors_error_on_missing_fields() {
        let empty = serde_json::json!({});
        assert!(extract_openai_content(&empty).is_err());
        assert!(extract_anthropic_content(&empty).is_err());
        assert!(extract_google_content(&empty).is_err());
    }
}
