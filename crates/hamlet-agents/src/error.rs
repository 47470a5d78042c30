//! Agent-side error and rejection types.

use hamlet_types::ActionKind;

/// Why an action was refused entry.
///
/// Rejections are domain results, not errors: the decider receives
/// them and re-decides (counting against its cooldown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The action id is not in the catalogue.
    UnknownAction,
    /// The action needs a facility and none covers the current node.
    NoFacilityHere,
    /// The facility lacks every acceptable tag combination.
    WrongFacility,
    /// The facility is owned by someone else.
    NotOwner,
    /// A stat is below the action's minimum threshold.
    StatTooLow,
    /// The character cannot cover the facility cost.
    InsufficientMoney,
    /// The target NPC is not adjacent on the navigation graph.
    NpcNotAdjacent,
    /// The target NPC is already in a conversation.
    NpcBusy,
    /// The character is not employed at this facility.
    NotEmployed,
    /// The facility's job does not cover the current hour.
    OutsideWorkHours,
}

impl core::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Self::UnknownAction => "unknown action",
            Self::NoFacilityHere => "no facility at this node",
            Self::WrongFacility => "facility lacks the required tags",
            Self::NotOwner => "facility belongs to someone else",
            Self::StatTooLow => "a required stat is too low",
            Self::InsufficientMoney => "not enough money",
            Self::NpcNotAdjacent => "the NPC is not within reach",
            Self::NpcBusy => "the NPC is already talking",
            Self::NotEmployed => "not employed here",
            Self::OutsideWorkHours => "outside working hours",
        };
        f.write_str(text)
    }
}

/// Errors raised by action execution after entry.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An action was promoted to execution but its definition vanished
    /// from the catalogue (config reload race; should not happen).
    #[error("no catalogue definition for action {action}")]
    MissingDefinition {
        /// The orphaned action.
        action: ActionKind,
    },

    /// Navigation state referenced a node that is not on the map.
    #[error("navigation references unknown node {node_id} on map {map_id}")]
    DanglingNavigation {
        /// Map being walked.
        map_id: hamlet_types::MapId,
        /// The missing node.
        node_id: hamlet_types::NodeId,
    },
}
