//! Shared type definitions for the Hamlet simulation.
//!
//! This crate holds the data model every other crate speaks: identifiers,
//! world time, geometry, maps and facilities, characters and their
//! behaviour substates, NPCs, conversations, schedules, history records,
//! activity log entries, behaviour decisions, and world snapshots.
//!
//! It deliberately contains no behaviour beyond small invariant-keeping
//! helpers (stat clamping, affinity clamping, time arithmetic); the
//! simulation logic lives in `hamlet-core`, `hamlet-world`, and
//! `hamlet-agents`.

pub mod action;
pub mod character;
pub mod conversation;
pub mod decision;
pub mod geometry;
pub mod history;
pub mod ids;
pub mod log;
pub mod map;
pub mod npc;
pub mod schedule;
pub mod snapshot;
pub mod time;

pub use action::ActionKind;
pub use character::{
    Character, CrossMapNavigation, CurrentAction, Employment, Navigation, PendingAction,
    RouteSegment, StatKind, StatRates, Stats, STAT_MAX, STAT_MIN,
};
pub use conversation::{
    ConversationGoal, ConversationMessage, ConversationSession, SessionStatus, Speaker,
    DEFAULT_MAX_TURNS,
};
pub use decision::{
    BehaviorContext, BehaviorDecision, DecisionKind, FacilitySummary, NearbyFacility, NearbyMap,
    NpcSummary,
};
pub use geometry::{Direction, PixelRect, Position};
pub use history::{ActionHistoryEntry, Importance, MidTermMemory};
pub use ids::{
    CharacterId, FacilityId, MapId, MemoryId, NodeId, NpcId, ObstacleId, SessionId,
};
pub use log::{ActionLogStatus, ActivityLogEntry, ActivityPayload};
pub use map::{
    EntranceLink, Facility, FacilityTag, Job, MapDef, NodeKind, Obstacle, ObstacleKind, PathNode,
};
pub use npc::Npc;
pub use schedule::{Schedule, ScheduleEntry, ScheduleUpdate};
pub use snapshot::{MapTransition, WorldSnapshot};
pub use time::{TimeError, WorldTime};
