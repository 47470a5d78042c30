//! Behaviour decisions and the context deciders receive.
//!
//! A decider (rule-based or LLM-backed) consumes a [`BehaviorContext`]
//! and produces a [`BehaviorDecision`]. Both shapes are shared so the
//! two implementations are interchangeable behind one trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::action::ActionKind;
use crate::character::Stats;
use crate::conversation::ConversationGoal;
use crate::history::{ActionHistoryEntry, MidTermMemory};
use crate::ids::{CharacterId, FacilityId, MapId, NodeId, NpcId};
use crate::map::FacilityTag;
use crate::schedule::{ScheduleEntry, ScheduleUpdate};
use crate::time::WorldTime;

/// What kind of behaviour the decider chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    /// Execute an action (possibly after moving to its facility).
    Action,
    /// Relocate to a target node, with nothing to do on arrival.
    Move,
    /// Do nothing this round.
    Idle,
}

/// The decider's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDecision {
    /// Chosen behaviour kind.
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    /// Action to execute, for [`DecisionKind::Action`].
    pub action_id: Option<ActionKind>,
    /// Target node, for moves and out-of-reach facilities.
    pub target_node_id: Option<NodeId>,
    /// Target map, when the target node is on another map.
    pub target_map_id: Option<MapId>,
    /// NPC to talk to, for `talk`.
    pub target_npc_id: Option<NpcId>,
    /// Facility to use, when the action needs one.
    pub target_facility_id: Option<FacilityId>,
    /// Conversation goal, for `talk`.
    pub conversation_goal: Option<ConversationGoal>,
    /// Requested duration in world minutes, for variable actions.
    pub duration_minutes: Option<u32>,
    /// Schedule mutation to apply before acting, when requested.
    pub schedule_update: Option<ScheduleUpdate>,
    /// Why the decider chose this (logged, not interpreted).
    pub reason: Option<String>,
}

impl BehaviorDecision {
    /// An idle decision with an optional reason.
    pub fn idle(reason: Option<String>) -> Self {
        Self {
            kind: DecisionKind::Idle,
            action_id: None,
            target_node_id: None,
            target_map_id: None,
            target_npc_id: None,
            target_facility_id: None,
            conversation_goal: None,
            duration_minutes: None,
            schedule_update: None,
            reason,
        }
    }

    /// An action decision with the common fields set.
    pub fn action(action_id: ActionKind, reason: Option<String>) -> Self {
        Self {
            kind: DecisionKind::Action,
            action_id: Some(action_id),
            target_node_id: None,
            target_map_id: None,
            target_npc_id: None,
            target_facility_id: None,
            conversation_goal: None,
            duration_minutes: None,
            schedule_update: None,
            reason,
        }
    }
}

/// A facility as presented to the decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitySummary {
    /// Facility identifier.
    pub facility_id: FacilityId,
    /// Map the facility is on.
    pub map_id: MapId,
    /// A node adjacent to (or inside) the facility a character can
    /// stand on to use it.
    pub access_node_id: NodeId,
    /// The facility's tags.
    pub tags: BTreeSet<FacilityTag>,
    /// Actions executable at this facility.
    pub available_actions: Vec<ActionKind>,
    /// Usage cost, when the facility charges.
    pub cost: Option<i64>,
    /// Human-readable label, when configured.
    pub label: Option<String>,
}

/// A reachable map as presented to the decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyMap {
    /// Map identifier.
    pub map_id: MapId,
    /// Display name.
    pub name: String,
    /// Entrance-graph hops from the character's current map.
    pub hops: u32,
}

/// A facility on another map, with its distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyFacility {
    /// The facility.
    pub facility: FacilitySummary,
    /// Entrance-graph hops from the character's current map.
    pub hops: u32,
}

/// An NPC visible to the decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcSummary {
    /// NPC identifier.
    pub npc_id: NpcId,
    /// Display name.
    pub name: String,
    /// Node the NPC occupies.
    pub node_id: NodeId,
    /// Current affinity toward characters.
    pub affinity: i32,
    /// Current mood word.
    pub mood: String,
    /// Whether the NPC is already in a conversation.
    pub in_conversation: bool,
}

/// Everything a decider may consider for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorContext {
    /// Deciding character.
    pub character_id: CharacterId,
    /// Display name.
    pub character_name: String,
    /// Current stats.
    pub stats: Stats,
    /// Current money.
    pub money: i64,
    /// Current map.
    pub map_id: MapId,
    /// Current node.
    pub node_id: NodeId,
    /// Current world time.
    pub time: WorldTime,
    /// Today's schedule entries.
    pub schedule_today: Vec<ScheduleEntry>,
    /// Actions executable right now at the current node.
    pub available_actions: Vec<ActionKind>,
    /// Facilities on the current map.
    pub current_map_facilities: Vec<FacilitySummary>,
    /// Maps within three entrance-graph hops.
    pub nearby_maps: Vec<NearbyMap>,
    /// Facilities on those nearby maps.
    pub nearby_facilities: Vec<NearbyFacility>,
    /// NPCs on the current map.
    pub nearby_npcs: Vec<NpcSummary>,
    /// Actions already executed today.
    pub today_actions: Vec<ActionHistoryEntry>,
    /// Active mid-term memories, when loaded.
    pub mid_term_memories: Vec<MidTermMemory>,
    /// Personality description, when configured.
    pub personality: Option<String>,
    /// Behavioural tendencies, when configured.
    pub tendencies: Vec<String>,
    /// Extra prompt text, when configured.
    pub custom_prompt: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decision_kind_serializes_as_type_field() {
        let d = BehaviorDecision::idle(Some(String::from("nothing to do")));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("idle"));
    }

    #[test]
    fn action_constructor_sets_kind_and_id() {
        let d = BehaviorDecision::action(ActionKind::Eat, None);
        assert_eq!(d.kind, DecisionKind::Action);
        assert_eq!(d.action_id, Some(ActionKind::Eat));
    }

    #[test]
    fn decision_deserializes_from_llm_shape() {
        let raw = r#"{
            "type": "action",
            "action_id": "sleep",
            "target_facility_id": "home-bed",
            "duration_minutes": 480,
            "reason": "it is late and energy is low"
        }"#;
        let d: BehaviorDecision = serde_json::from_str(raw).unwrap();
        assert_eq!(d.kind, DecisionKind::Action);
        assert_eq!(d.action_id, Some(ActionKind::Sleep));
        assert_eq!(d.duration_minutes, Some(480));
    }
}
