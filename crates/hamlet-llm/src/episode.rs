//! The LLM-backed mini-episode generator.
//!
//! Requests are queued fire-and-forget when an action completes; the
//! tick loop drains finished episodes at the start of a later tick and
//! attaches them to action history. Generation failures yield an
//! empty result (the action simply gets no episode) but still feed the
//! failure counter.

use std::collections::BTreeMap;
use std::sync::Arc;

use hamlet_core::decision::{EpisodePolicy, EpisodeRequest, EpisodeResult, MiniEpisode};
use hamlet_types::StatKind;
use serde::Deserialize;
use tracing::warn;

use crate::broker::TaskBroker;
use crate::classify::ErrorMonitor;
use crate::gateway::LlmGateway;
use crate::prompt::PromptEngine;

/// The wire shape of a generated episode.
#[derive(Debug, Deserialize)]
struct EpisodeWire {
    episode: String,
    #[serde(default)]
    stat_deltas: Option<BTreeMap<StatKind, f64>>,
}

/// Monotonic key for queued episode requests.
type RequestKey = u64;

/// The LLM episode generator.
pub struct LlmEpisodePolicy {
    gateway: Arc<LlmGateway>,
    prompts: Arc<PromptEngine>,
    monitor: Arc<ErrorMonitor>,
    broker: TaskBroker<RequestKey, (EpisodeRequest, Result<EpisodeWire, String>)>,
    next_key: RequestKey,
}

impl LlmEpisodePolicy {
    /// Create the generator over shared gateway, prompts, and monitor.
    pub fn new(
        gateway: Arc<LlmGateway>,
        prompts: Arc<PromptEngine>,
        monitor: Arc<ErrorMonitor>,
    ) -> Self {
        Self {
            gateway,
            prompts,
            monitor,
            broker: TaskBroker::new(),
            next_key: 0,
        }
    }
}

impl EpisodePolicy for LlmEpisodePolicy {
    fn request(&mut self, request: EpisodeRequest) {
        let prompt = match self.prompts.render_episode(
            &request.character_name,
            request.action_id.as_str(),
            request.day,
            &request.time,
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(character = %request.character_id, error = %e, "episode prompt failed");
                return;
            }
        };

        let key = self.next_key;
        self.next_key = self.next_key.saturating_add(1);

        let gateway = Arc::clone(&self.gateway);
        self.broker.spawn(key, async move {
            let result = gateway
                .generate_object::<EpisodeWire>(&prompt)
                .await
                .map_err(|e| e.to_string());
            (request, result)
        });
    }

    fn drain(&mut self) -> Vec<EpisodeResult> {
        self.broker
            .drain_ready()
            .into_iter()
            .map(|(_key, (request, result))| match result {
                Ok(wire) => {
                    self.monitor.record_success();
                    EpisodeResult {
                        request,
                        episode: Some(MiniEpisode {
                            episode: wire.episode,
                            stat_deltas: wire.stat_deltas,
                        }),
                    }
                }
                Err(message) => {
                    self.monitor.record_failure(&message);
                    EpisodeResult {
                        request,
                        episode: None,
                    }
                }
            })
            .collect()
    }

    fn cancel_all(&mut self) {
        self.broker.cancel_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn episode_wire_parses_with_and_without_deltas() {
        let bare: EpisodeWire =
            serde_json::from_str(r#"{"episode": "A sparrow stole a crumb."}"#).unwrap();
        assert!(bare.stat_deltas.is_none());

        let with: EpisodeWire = serde_json::from_str(
            r#"{"episode": "A warm nap.", "stat_deltas": {"mood": 2.0}}"#,
        )
        .unwrap();
        let deltas = with.stat_deltas.unwrap();
        assert!(deltas.get(&StatKind::Mood).copied().unwrap() > 1.9);
    }
}
