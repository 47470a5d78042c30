//! Static NPC data model.
//!
//! NPCs never move; each one blocks the node it stands on and can hold
//! at most one conversation at a time.

use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, Position};
use crate::ids::{MapId, NodeId, NpcId};
use crate::time::WorldTime;

/// A stationary non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    /// Stable identifier.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Map the NPC stands on.
    pub map_id: MapId,
    /// Node the NPC occupies (blocked for pathfinding).
    pub current_node_id: NodeId,
    /// Pixel position.
    pub position: Position,
    /// Sprite facing direction.
    pub direction: Direction,
    /// Personality description fed to conversation prompts.
    pub personality: String,
    /// Behavioural tendencies fed to conversation prompts.
    pub tendencies: Vec<String>,
    /// Extra prompt text, when configured.
    pub custom_prompt: Option<String>,
    /// Facts the NPC knows (grows as conversations reveal more).
    pub facts: Vec<String>,
    /// Disposition toward characters, clamped to a configured range.
    pub affinity: i32,
    /// Current mood word (free-form, set by conversations).
    pub mood: String,
    /// Number of conversations this NPC has completed.
    pub conversation_count: u32,
    /// World time of the last completed conversation.
    pub last_conversation_at: Option<WorldTime>,
    /// Whether a conversation is currently open with this NPC.
    pub in_conversation: bool,
}

impl Npc {
    /// Apply a signed affinity delta, clamping to `[-limit, limit]`.
    pub const fn apply_affinity_delta(&mut self, delta: i32, limit: i32) {
        let next = self.affinity.saturating_add(delta);
        let bound = if limit < 0 { -limit } else { limit };
        self.affinity = if next > bound {
            bound
        } else if next < -bound {
            -bound
        } else {
            next
        };
    }

    /// Record a completed conversation.
    pub const fn record_conversation(&mut self, at: WorldTime) {
        self.conversation_count = self.conversation_count.saturating_add(1);
        self.last_conversation_at = Some(at);
        self.in_conversation = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn npc() -> Npc {
        Npc {
            id: NpcId::from("baker"),
            name: String::from("Baker"),
            map_id: MapId::from("town"),
            current_node_id: NodeId::from("town-2-2"),
            position: Position::new(80.0, 80.0),
            direction: Direction::Down,
            personality: String::from("cheerful"),
            tendencies: Vec::new(),
            custom_prompt: None,
            facts: Vec::new(),
            affinity: 0,
            mood: String::from("neutral"),
            conversation_count: 0,
            last_conversation_at: None,
            in_conversation: false,
        }
    }

    #[test]
    fn affinity_clamps_both_ends() {
        let mut n = npc();
        n.apply_affinity_delta(150, 100);
        assert_eq!(n.affinity, 100);
        n.apply_affinity_delta(-300, 100);
        assert_eq!(n.affinity, -100);
    }

    #[test]
    fn affinity_accumulates_within_range() {
        let mut n = npc();
        n.apply_affinity_delta(10, 100);
        n.apply_affinity_delta(-4, 100);
        assert_eq!(n.affinity, 6);
    }

    #[test]
    fn record_conversation_updates_bookkeeping() {
        let mut n = npc();
        n.in_conversation = true;
        let at = WorldTime::new(2, 14, 30).unwrap();
        n.record_conversation(at);
        assert_eq!(n.conversation_count, 1);
        assert_eq!(n.last_conversation_at, Some(at));
        assert!(!n.in_conversation);
    }
}
