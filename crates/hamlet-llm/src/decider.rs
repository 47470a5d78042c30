//! The LLM-backed behaviour policy.
//!
//! On the first poll for a character a background task is spawned
//! carrying the rendered prompt; the tick loop sees [`Pending`] until
//! the result lands (an LLM call begun in tick T applies no earlier
//! than tick T+1). Structured output failing validation is classified
//! `LLM_INVALID_RESPONSE` and the rule-based fallback is consulted;
//! other failures surface as classified decision failures with
//! exponential back-off applied by the simulator.
//!
//! [`Pending`]: DecisionPoll::Pending

use std::sync::Arc;

use hamlet_core::decision::{BehaviorPolicy, DecisionPoll, PolicyFailure};
use hamlet_core::rules::RulePolicy;
use hamlet_types::{ActionKind, BehaviorContext, BehaviorDecision, CharacterId, DecisionKind};
use tracing::{debug, warn};

use crate::broker::TaskBroker;
use crate::classify::ErrorMonitor;
use crate::error::LlmErrorCode;
use crate::gateway::LlmGateway;
use crate::prompt::PromptEngine;

/// The LLM decider with rule fallback.
pub struct LlmBehaviorPolicy {
    gateway: Arc<LlmGateway>,
    prompts: Arc<PromptEngine>,
    monitor: Arc<ErrorMonitor>,
    fallback: RulePolicy,
    broker: TaskBroker<CharacterId, Result<BehaviorDecision, String>>,
}

impl LlmBehaviorPolicy {
    /// Create the policy over shared gateway, prompts, and monitor.
    pub fn new(
        gateway: Arc<LlmGateway>,
        prompts: Arc<PromptEngine>,
        monitor: Arc<ErrorMonitor>,
        fallback: RulePolicy,
    ) -> Self {
        Self {
            gateway,
            prompts,
            monitor,
            fallback,
            broker: TaskBroker::new(),
        }
    }

    /// Handle a landed result: validate, fall back, or fail.
    fn resolve(
        &mut self,
        ctx: &BehaviorContext,
        result: Result<BehaviorDecision, String>,
    ) -> DecisionPoll {
        match result {
            Ok(decision) => match validate_decision(&decision, ctx) {
                Ok(()) => {
                    self.monitor.record_success();
                    debug!(character = %ctx.character_id, kind = ?decision.kind, "LLM decision accepted");
                    DecisionPoll::Ready(decision)
                }
                Err(problem) => {
                    let message = format!("invalid decision: {problem}");
                    let classified = self.monitor.record_failure(&message);
                    debug!(
                        character = %ctx.character_id,
                        code = %classified.code,
                        "falling back to rule policy"
                    );
                    DecisionPoll::Ready(self.fallback.decide(ctx))
                }
            },
            Err(message) => {
                let classified = self.monitor.record_failure(&message);
                if classified.code == LlmErrorCode::InvalidResponse {
                    return DecisionPoll::Ready(self.fallback.decide(ctx));
                }
                DecisionPoll::Failed(PolicyFailure {
                    code: classified.code.as_str().to_owned(),
                    message,
                })
            }
        }
    }
}

impl BehaviorPolicy for LlmBehaviorPolicy {
    fn poll_decide(&mut self, ctx: &BehaviorContext) -> DecisionPoll {
        if let Some(result) = self.broker.take_ready(&ctx.character_id) {
            return self.resolve(ctx, result);
        }
        if self.broker.is_in_flight(&ctx.character_id) {
            return DecisionPoll::Pending;
        }

        let prompt = match self.prompts.render_decision(ctx) {
            Ok(prompt) => prompt,
            Err(e) => {
                let message = e.to_string();
                let classified = self.monitor.record_failure(&message);
                warn!(character = %ctx.character_id, %message, "decision prompt failed");
                return DecisionPoll::Failed(PolicyFailure {
                    code: classified.code.as_str().to_owned(),
                    message,
                });
            }
        };

        let gateway = Arc::clone(&self.gateway);
        self.broker.spawn(ctx.character_id.clone(), async move {
            gateway
                .generate_object::<BehaviorDecision>(&prompt)
                .await
                .map_err(|e| e.to_string())
        });
        DecisionPoll::Pending
    }

    fn cancel_all(&mut self) {
        self.broker.cancel_all();
    }
}

/// Structural validation of an LLM decision against its context.
fn validate_decision(decision: &BehaviorDecision, ctx: &BehaviorContext) -> Result<(), String> {
    match decision.kind {
        DecisionKind::Idle => Ok(()),
        DecisionKind::Move => {
            if decision.target_node_id.is_none() && decision.target_map_id.is_none() {
                return Err(String::from("move without any target"));
            }
            Ok(())
        }
        DecisionKind::Action => {
            let Some(action_id) = decision.action_id else {
                return Err(String::from("action without action_id"));
            };
            if action_id == ActionKind::Thinking {
                return Err(String::from("thinking is not an executable action"));
            }
            if action_id == ActionKind::Talk {
                let Some(npc_id) = decision.target_npc_id.as_ref() else {
                    return Err(String::from("talk without target_npc_id"));
                };
                if !ctx.nearby_npcs.iter().any(|n| n.npc_id == *npc_id) {
                    return Err(format!("talk targets unknown npc {npc_id}"));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlet_types::{MapId, NodeId, NpcId, NpcSummary, Stats, WorldTime};

    use super::*;

    fn context() -> BehaviorContext {
        BehaviorContext {
            character_id: CharacterId::from("alice"),
            character_name: String::from("Alice"),
            stats: Stats::default(),
            money: 0,
            map_id: MapId::from("town"),
            node_id: NodeId::from("town-0-0"),
            time: WorldTime::new(0, 9, 0).unwrap(),
            schedule_today: Vec::new(),
            available_actions: Vec::new(),
            current_map_facilities: Vec::new(),
            nearby_maps: Vec::new(),
            nearby_facilities: Vec::new(),
            nearby_npcs: vec![NpcSummary {
                npc_id: NpcId::from("baker"),
                name: String::from("Baker"),
                node_id: NodeId::from("town-0-1"),
                affinity: 0,
                mood: String::from("neutral"),
                in_conversation: false,
            }],
            today_actions: Vec::new(),
            mid_term_memories: Vec::new(),
            personality: None,
            tendencies: Vec::new(),
            custom_prompt: None,
        }
    }

    #[test]
    fn idle_decisions_validate() {
        let d = BehaviorDecision::idle(None);
        assert!(validate_decision(&d, &context()).is_ok());
    }

    #[test]
    fn action_requires_action_id() {
        let mut d = BehaviorDecision::idle(None);
        d.kind = DecisionKind::Action;
        assert!(validate_decision(&d, &context()).is_err());
    }

    #[test]
    fn thinking_is_rejected() {
        let d = BehaviorDecision::action(ActionKind::Thinking, None);
        assert!(validate_decision(&d, &context()).is_err());
    }

    #[test]
    fn talk_requires_known_npc() {
        let mut d = BehaviorDecision::action(ActionKind::Talk, None);
        assert!(validate_decision(&d, &context()).is_err());

        d.target_npc_id = Some(NpcId::from("stranger"));
        assert!(validate_decision(&d, &context()).is_err());

        d.target_npc_id = Some(NpcId::from("baker"));
        assert!(validate_decision(&d, &context()).is_ok());
    }

    #[test]
    fn move_requires_some_target() {
        let mut d = BehaviorDecision::idle(None);
        d.kind = DecisionKind::Move;
        assert!(validate_decision(&d, &context()).is_err());
        d.target_map_id = Some(MapId::from("home"));
        assert!(validate_decision(&d, &context()).is_ok());
    }
}
