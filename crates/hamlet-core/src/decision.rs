//! Behaviour, conversation, and episode policy traits.
//!
//! Policies are the only suspension points in the simulation. The tick
//! loop never blocks on them: every operation is a non-blocking poll.
//! A policy backed by an LLM spawns a background task on the first
//! poll and reports [`Pending`] until the result lands; a result that
//! arrives after the character has left the originating state is
//! discarded by the caller. At most one in-flight request exists per
//! character.
//!
//! [`Pending`]: DecisionPoll::Pending

use hamlet_types::{
    ActionKind, BehaviorContext, BehaviorDecision, Character, CharacterId, ConversationSession,
    Npc, StatRates,
};

use hamlet_agents::conversation::TurnOutcome;

/// A decision failure already classified by the error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFailure {
    /// Taxonomy code (e.g. `LLM_TIMEOUT`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// Result of polling for a behaviour decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionPoll {
    /// A decision is available.
    Ready(BehaviorDecision),
    /// A request is in flight; ask again next tick.
    Pending,
    /// The decision attempt failed; back-off applies.
    Failed(PolicyFailure),
}

/// Result of polling for a conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPoll {
    /// A turn is available.
    Ready(TurnOutcome),
    /// A request is in flight; ask again next tick.
    Pending,
    /// The turn attempt failed; the session closes with a fallback.
    Failed(PolicyFailure),
}

/// Source of behaviour decisions.
pub trait BehaviorPolicy: Send {
    /// Poll for a decision for the character described by `ctx`.
    fn poll_decide(&mut self, ctx: &BehaviorContext) -> DecisionPoll;

    /// Cancel all in-flight work (engine stop). Late results are
    /// discarded.
    fn cancel_all(&mut self) {}
}

/// Source of conversation turns.
pub trait ConversationPolicy: Send {
    /// Poll for the next turn of `session`.
    fn poll_turn(
        &mut self,
        session: &ConversationSession,
        character: &Character,
        npc: &Npc,
    ) -> TurnPoll;

    /// Cancel all in-flight work (engine stop).
    fn cancel_all(&mut self) {}
}

/// A generated post-action narrative fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniEpisode {
    /// The narrative text.
    pub episode: String,
    /// Optional stat deltas applied when the episode lands.
    pub stat_deltas: Option<StatRates>,
}

/// A request for a mini-episode, queued fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRequest {
    /// The acting character.
    pub character_id: CharacterId,
    /// The character's display name.
    pub character_name: String,
    /// The completed action.
    pub action_id: ActionKind,
    /// Day the action completed on (history key).
    pub day: u32,
    /// Clock time the action completed at (history key).
    pub time: String,
}

/// A finished mini-episode, ready to attach.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeResult {
    /// The originating request.
    pub request: EpisodeRequest,
    /// The generated episode, or `None` when generation failed.
    pub episode: Option<MiniEpisode>,
}

/// Source of mini-episodes.
///
/// Requests are queued without blocking; completed results are drained
/// at the start of a later tick and attached to action history then.
pub trait EpisodePolicy: Send {
    /// Queue an episode request.
    fn request(&mut self, request: EpisodeRequest);

    /// Drain completed episodes.
    fn drain(&mut self) -> Vec<EpisodeResult>;

    /// Cancel all in-flight work (engine stop).
    fn cancel_all(&mut self) {}
}

// ---------------------------------------------------------------------------
// Test stubs
// ---------------------------------------------------------------------------

/// A behaviour policy that pops pre-scripted decisions, idling when
/// the script runs dry. Exercises the tick cycle without any LLM.
#[derive(Debug, Default)]
pub struct ScriptedBehaviorPolicy {
    /// Decisions returned in order, newest last.
    pub script: std::collections::VecDeque<DecisionPoll>,
}

impl ScriptedBehaviorPolicy {
    /// An always-idle policy.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A policy that returns the given polls in order.
    pub fn with_script(polls: Vec<DecisionPoll>) -> Self {
        Self {
            script: polls.into_iter().collect(),
        }
    }
}

impl BehaviorPolicy for ScriptedBehaviorPolicy {
    fn poll_decide(&mut self, _ctx: &BehaviorContext) -> DecisionPoll {
        self.script
            .pop_front()
            .unwrap_or_else(|| DecisionPoll::Ready(BehaviorDecision::idle(None)))
    }
}

/// A conversation policy that pops pre-scripted turns, closing the
/// session when the script runs dry.
#[derive(Debug, Default)]
pub struct ScriptedConversationPolicy {
    /// Turns returned in order.
    pub script: std::collections::VecDeque<TurnPoll>,
}

impl ScriptedConversationPolicy {
    /// A policy that returns the given polls in order.
    pub fn with_script(polls: Vec<TurnPoll>) -> Self {
        Self {
            script: polls.into_iter().collect(),
        }
    }
}

impl ConversationPolicy for ScriptedConversationPolicy {
    fn poll_turn(
        &mut self,
        _session: &ConversationSession,
        _character: &Character,
        npc: &Npc,
    ) -> TurnPoll {
        self.script.pop_front().unwrap_or_else(|| {
            TurnPoll::Ready(TurnOutcome {
                utterance: format!("{} nods politely.", npc.name),
                speaker: hamlet_types::Speaker::Npc,
                goal_achieved: false,
                end_conversation: true,
                npc_mood: None,
                affinity_delta: None,
                fact_learned: None,
            })
        })
    }
}

/// An episode policy that never generates anything.
#[derive(Debug, Default)]
pub struct NoEpisodes;

impl EpisodePolicy for NoEpisodes {
    fn request(&mut self, _request: EpisodeRequest) {}

    fn drain(&mut self) -> Vec<EpisodeResult> {
        Vec::new()
    }
}
