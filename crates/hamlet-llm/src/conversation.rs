//! The LLM-backed conversation turn driver.
//!
//! One background request per session at a time, keyed by session id.
//! The simulator polls once per conversation interval; failures are
//! classified (feeding the shared failure counter) and surface as
//! failed turns, which close the session with a fallback summary.

use std::sync::Arc;

use hamlet_agents::conversation::TurnOutcome;
use hamlet_core::decision::{ConversationPolicy, PolicyFailure, TurnPoll};
use hamlet_types::{Character, ConversationSession, Npc, SessionId};
use tracing::warn;

use crate::broker::TaskBroker;
use crate::classify::ErrorMonitor;
use crate::gateway::LlmGateway;
use crate::prompt::PromptEngine;

/// The LLM conversation driver.
pub struct LlmConversationPolicy {
    gateway: Arc<LlmGateway>,
    prompts: Arc<PromptEngine>,
    monitor: Arc<ErrorMonitor>,
    broker: TaskBroker<SessionId, Result<TurnOutcome, String>>,
}

impl LlmConversationPolicy {
    /// Create the driver over shared gateway, prompts, and monitor.
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
        }
    }
}

impl ConversationPolicy for LlmConversationPolicy {
    fn poll_turn(
        &mut self,
        session: &ConversationSession,
        character: &Character,
        npc: &Npc,
    ) -> TurnPoll {
        if let Some(result) = self.broker.take_ready(&session.id) {
            return match result {
                Ok(outcome) => {
                    self.monitor.record_success();
                    TurnPoll::Ready(outcome)
                }
                Err(message) => {
                    let classified = self.monitor.record_failure(&message);
                    TurnPoll::Failed(PolicyFailure {
                        code: classified.code.as_str().to_owned(),
                        message,
                    })
                }
            };
        }
        if self.broker.is_in_flight(&session.id) {
            return TurnPoll::Pending;
        }

        let prompt = match self.prompts.render_conversation(session, character, npc) {
            Ok(prompt) => prompt,
            Err(e) => {
                let message = e.to_string();
                let classified = self.monitor.record_failure(&message);
                warn!(session = %session.id, %message, "conversation prompt failed");
                return TurnPoll::Failed(PolicyFailure {
                    code: classified.code.as_str().to_owned(),
                    message,
                });
            }
        };

        let gateway = Arc::clone(&self.gateway);
        self.broker.spawn(session.id, async move {
            gateway
                .generate_object::<TurnOutcome>(&prompt)
                .await
                .map_err(|e| e.to_string())
        });
        TurnPoll::Pending
    }

    fn cancel_all(&mut self) {
        self.broker.cancel_all();
    }
}
