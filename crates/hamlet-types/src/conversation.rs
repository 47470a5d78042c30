//! Conversation session data model.
//!
//! A session is created when a `talk` action starts and closed when the
//! LLM signals completion, the goal is achieved, or the turn budget is
//! exhausted. Sessions reference their participants by id only; the
//! world state owns the entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, NpcId, SessionId};
use crate::time::WorldTime;

/// Default number of turns before a session is force-closed.
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Who uttered a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The simulated character.
    Character,
    /// The static NPC.
    Npc,
}

/// The lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Turns are still being exchanged.
    Active,
    /// Closed normally (goal, end signal, or turn budget).
    Completed,
    /// Closed abnormally (engine stop, participant removed).
    Aborted,
}

/// What the character hopes to get out of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationGoal {
    /// The objective in prose.
    pub goal: String,
    /// How to recognise success.
    pub success_criteria: String,
}

/// One utterance in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Which side spoke.
    pub speaker: Speaker,
    /// Identifier of the speaker (character or NPC id).
    pub speaker_id: String,
    /// Display name of the speaker.
    pub speaker_name: String,
    /// The spoken text.
    pub utterance: String,
    /// Wall-clock timestamp of the utterance.
    pub timestamp: DateTime<Utc>,
}

/// A turn-based dialogue between one character and one NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Session identifier.
    pub id: SessionId,
    /// Participating character.
    pub character_id: CharacterId,
    /// Participating NPC.
    pub npc_id: NpcId,
    /// The character's objective.
    pub goal: ConversationGoal,
    /// Utterances so far, oldest first.
    pub messages: Vec<ConversationMessage>,
    /// Turns taken so far.
    pub current_turn: u32,
    /// Turn budget.
    pub max_turns: u32,
    /// World time at session start.
    pub start_time: WorldTime,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Whether the goal was achieved before closing.
    pub goal_achieved: bool,
    /// Sum of affinity deltas applied to the NPC during this session.
    pub affinity_change: i32,
    /// Earliest world time at which the next turn may run.
    pub next_turn_at: WorldTime,
}

impl ConversationSession {
    /// Open a new session.
    pub fn open(
        character_id: CharacterId,
        npc_id: NpcId,
        goal: ConversationGoal,
        start_time: WorldTime,
    ) -> Self {
        Self {
            id: SessionId::new(),
            character_id,
            npc_id,
            goal,
            messages: Vec::new(),
            current_turn: 0,
            max_turns: DEFAULT_MAX_TURNS,
            start_time,
            status: SessionStatus::Active,
            goal_achieved: false,
            affinity_change: 0,
            next_turn_at: start_time,
        }
    }

    /// Whether the turn budget is exhausted.
    pub const fn turns_exhausted(&self) -> bool {
        self.current_turn >= self.max_turns
    }

    /// Append an utterance and advance the turn counter.
    pub fn push_message(&mut self, message: ConversationMessage) {
        self.messages.push(message);
        self.current_turn = self.current_turn.saturating_add(1);
    }
}
