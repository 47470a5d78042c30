//! Conversation session mechanics.
//!
//! The LLM (or a scripted driver in tests) produces one
//! [`TurnOutcome`] per conversation interval; this module applies it
//! to the session and the NPC, decides when the session closes, and
//! assembles the closing summary. Prompting itself lives elsewhere.

use chrono::Utc;
use hamlet_types::{
    ConversationMessage, ConversationSession, Npc, SessionStatus, Speaker, WorldTime,
};
use tracing::debug;

/// One structured conversation turn, as produced by the driver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// The spoken text.
    pub utterance: String,
    /// Which side spoke.
    pub speaker: Speaker,
    /// Whether the character's goal has been achieved.
    #[serde(default)]
    pub goal_achieved: bool,
    /// Whether the dialogue should end now.
    #[serde(default)]
    pub end_conversation: bool,
    /// New mood word for the NPC, when it shifted.
    #[serde(default)]
    pub npc_mood: Option<String>,
    /// Signed affinity delta toward the character.
    #[serde(default)]
    pub affinity_delta: Option<i32>,
    /// A fact the character learned, to become a mid-term memory.
    #[serde(default)]
    pub fact_learned: Option<String>,
}

/// The summary data emitted when a session closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    /// Summary prose (caller may replace with generated text).
    pub summary: String,
    /// Topics touched, one per exchanged utterance pair.
    pub topics: Vec<String>,
    /// Net affinity change over the session.
    pub affinity_change: i32,
    /// The NPC's mood at close.
    pub npc_mood: String,
    /// Whether the goal was achieved.
    pub goal_achieved: bool,
}

/// Apply one turn to the session and its NPC.
///
/// Appends the utterance, bumps the turn counter, applies mood and
/// affinity updates (clamped to `[-affinity_limit, affinity_limit]`),
/// and reschedules the next turn.
pub fn apply_turn(
    session: &mut ConversationSession,
    npc: &mut Npc,
    character_name: &str,
    outcome: &TurnOutcome,
    now: WorldTime,
    turn_interval_minutes: u32,
    affinity_limit: i32,
) {
    let (speaker_id, speaker_name) = match outcome.speaker {
        Speaker::Character => (session.character_id.to_string(), character_name.to_owned()),
        Speaker::Npc => (npc.id.to_string(), npc.name.clone()),
    };

    session.push_message(ConversationMessage {
        speaker: outcome.speaker,
        speaker_id,
        speaker_name,
        utterance: outcome.utterance.clone(),
        timestamp: Utc::now(),
    });
    session.next_turn_at = now.plus_minutes(turn_interval_minutes);

    if let Some(delta) = outcome.affinity_delta {
        npc.apply_affinity_delta(delta, affinity_limit);
        session.affinity_change = session.affinity_change.saturating_add(delta);
    }
    if let Some(mood) = outcome.npc_mood.as_ref() {
        npc.mood.clone_from(mood);
    }
    if let Some(fact) = outcome.fact_learned.as_ref() {
        npc.facts.push(fact.clone());
    }
    if outcome.goal_achieved {
        session.goal_achieved = true;
    }

    debug!(
        session = %session.id,
        turn = session.current_turn,
        speaker = ?outcome.speaker,
        "Conversation turn applied"
    );
}

/// Whether the session should close after the latest turn.
pub fn should_close(session: &ConversationSession, outcome: &TurnOutcome) -> bool {
    outcome.end_conversation || session.goal_achieved || session.turns_exhausted()
}

/// Close the session and produce its summary.
///
/// Marks the session completed, releases the NPC, and derives a
/// deterministic fallback summary (callers may substitute generated
/// prose before logging).
pub fn close_session(
    session: &mut ConversationSession,
    npc: &mut Npc,
    now: WorldTime,
) -> ConversationSummary {
    session.status = SessionStatus::Completed;
    npc.record_conversation(now);

    let topics: Vec<String> = session
        .messages
        .iter()
        .filter(|m| matches!(m.speaker, Speaker::Character))
        .map(|m| truncate_topic(&m.utterance))
        .collect();

    ConversationSummary {
        summary: format!(
            "{} exchanged {} lines with {} about {}.",
            session.character_id,
            session.messages.len(),
            npc.name,
            session.goal.goal
        ),
        topics,
        affinity_change: session.affinity_change,
        npc_mood: npc.mood.clone(),
        goal_achieved: session.goal_achieved,
    }
}

/// Abort an active session (engine stop, participant removal).
pub fn abort_session(session: &mut ConversationSession, npc: &mut Npc) {
    session.status = SessionStatus::Aborted;
    npc.in_conversation = false;
}

/// First few words of an utterance, used as a topic marker.
fn truncate_topic(utterance: &str) -> String {
    let words: Vec<&str> = utterance.split_whitespace().take(6).collect();
    words.join(" ")
}
