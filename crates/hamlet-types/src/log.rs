//! Activity log entries emitted to observers.
//!
//! Log entries are produced on state-machine transitions and streamed
//! to subscribers; they are never stored in world state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::ids::{CharacterId, NpcId, SessionId};
use crate::time::WorldTime;

/// Whether an action log entry marks the start or the end of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionLogStatus {
    /// The action just entered execution.
    Started,
    /// The action ran to completion.
    Completed,
}

/// The kind-specific payload of an activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityPayload {
    /// An action started or completed.
    Action {
        /// Start or completion.
        status: ActionLogStatus,
        /// Which action.
        action_id: ActionKind,
        /// Target (facility or NPC id), when the action had one.
        target: Option<String>,
        /// Duration in world minutes, for timed actions.
        duration_minutes: Option<u32>,
        /// The decider's stated reason, when available.
        reason: Option<String>,
    },
    /// A conversation session closed; carries its summary.
    Conversation {
        /// Session that closed.
        session_id: SessionId,
        /// Conversation partner.
        npc_id: NpcId,
        /// Summary prose.
        summary: String,
        /// Topics touched during the session.
        topics: Vec<String>,
        /// Net affinity change applied to the NPC.
        affinity_change: i32,
        /// The NPC's mood at close.
        npc_mood: String,
        /// Whether the goal was achieved.
        goal_achieved: bool,
    },
    /// One utterance within an active conversation.
    ConversationMessage {
        /// Session the utterance belongs to.
        session_id: SessionId,
        /// Conversation partner.
        npc_id: NpcId,
        /// Display name of whoever spoke.
        speaker_name: String,
        /// The spoken text.
        utterance: String,
    },
    /// A post-action narrative fragment.
    MiniEpisode {
        /// The action the episode decorates.
        action_id: ActionKind,
        /// The narrative text.
        episode: String,
    },
}

/// One observer-visible log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Wall-clock timestamp of emission.
    pub timestamp: DateTime<Utc>,
    /// World time at emission.
    pub world_time: WorldTime,
    /// The character the entry concerns.
    pub character_id: CharacterId,
    /// Display name of that character.
    pub character_name: String,
    /// Per-character monotonic sequence number.
    pub sequence: u64,
    /// Kind-specific payload.
    pub payload: ActivityPayload,
}
