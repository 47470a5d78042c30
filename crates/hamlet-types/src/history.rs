//! Action history and mid-term memory records.

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::ids::{CharacterId, MemoryId, NpcId};

/// One completed action, appended to the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHistoryEntry {
    /// The character that acted.
    pub character_id: CharacterId,
    /// Day the action completed on.
    pub day: u32,
    /// Clock time (`"HH:MM"`) the action completed at.
    pub time: String,
    /// Which action ran.
    pub action_id: ActionKind,
    /// Target (facility id, NPC id), when the action had one.
    pub target: Option<String>,
    /// Duration in world minutes, for timed actions.
    pub duration_minutes: Option<u32>,
    /// The decider's stated reason, when available.
    pub reason: Option<String>,
    /// Narrative episode attached after completion, when generated.
    pub episode: Option<String>,
}

/// Importance tier of a mid-term memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Background detail.
    Low,
    /// Worth recalling for a few days.
    Medium,
    /// Should shape behaviour until it expires.
    High,
}

/// A fact a character retains across days, with an expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidTermMemory {
    /// Memory identifier.
    pub id: MemoryId,
    /// Owning character.
    pub character_id: CharacterId,
    /// The remembered content.
    pub content: String,
    /// How strongly the memory should influence decisions.
    pub importance: Importance,
    /// Day the memory was formed.
    pub created_day: u32,
    /// Last day (inclusive) the memory remains active.
    pub expires_day: u32,
    /// NPC the memory came from, when learned in conversation.
    pub source_npc_id: Option<NpcId>,
}

impl MidTermMemory {
    /// Whether the memory has expired as of the given day.
    pub const fn is_expired(&self, current_day: u32) -> bool {
        self.expires_day < current_day
    }
}
