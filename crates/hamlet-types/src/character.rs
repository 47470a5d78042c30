//! Character data model: stats, location, and behaviour substates.
//!
//! A [`Character`] bundles identity, interior stats, map location, and
//! the mutually-exclusive behaviour substates (navigation, current
//! action, pending action, conversation). The invariants between those
//! substates are enforced by the simulator; this module only defines
//! the shapes and the stat clamping rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::conversation::ConversationGoal;
use crate::geometry::{Direction, Position};
use crate::ids::{CharacterId, FacilityId, MapId, NodeId, NpcId, SessionId};
use crate::time::WorldTime;

/// Lower bound of every stat.
pub const STAT_MIN: f64 = 0.0;

/// Upper bound of every stat.
pub const STAT_MAX: f64 = 100.0;

/// The five interior stats every character tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    /// Fullness; depleted by time, restored by eating.
    Satiety,
    /// Wakefulness; depleted by time and work, restored by sleep.
    Energy,
    /// Cleanliness; depleted by time, restored by bathing.
    Hygiene,
    /// Emotional wellbeing.
    Mood,
    /// Bladder pressure relief; low means urgent.
    Bladder,
}

impl StatKind {
    /// All stat kinds in a fixed order.
    pub const ALL: [Self; 5] = [
        Self::Satiety,
        Self::Energy,
        Self::Hygiene,
        Self::Mood,
        Self::Bladder,
    ];
}

/// The clamped stat vector of one character.
///
/// Every mutation goes through [`Stats::set`] or [`Stats::apply_delta`],
/// both of which clamp to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Fullness, `[0, 100]`.
    pub satiety: f64,
    /// Wakefulness, `[0, 100]`.
    pub energy: f64,
    /// Cleanliness, `[0, 100]`.
    pub hygiene: f64,
    /// Emotional wellbeing, `[0, 100]`.
    pub mood: f64,
    /// Bladder relief, `[0, 100]`.
    pub bladder: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            satiety: STAT_MAX,
            energy: STAT_MAX,
            hygiene: STAT_MAX,
            mood: STAT_MAX,
            bladder: STAT_MAX,
        }
    }
}

impl Stats {
    /// Read one stat.
    pub const fn get(&self, kind: StatKind) -> f64 {
        match kind {
            StatKind::Satiety => self.satiety,
            StatKind::Energy => self.energy,
            StatKind::Hygiene => self.hygiene,
            StatKind::Mood => self.mood,
            StatKind::Bladder => self.bladder,
        }
    }

    /// Set one stat, clamped to `[0, 100]`.
    pub fn set(&mut self, kind: StatKind, value: f64) {
        let clamped = value.clamp(STAT_MIN, STAT_MAX);
        match kind {
            StatKind::Satiety => self.satiety = clamped,
            StatKind::Energy => self.energy = clamped,
            StatKind::Hygiene => self.hygiene = clamped,
            StatKind::Mood => self.mood = clamped,
            StatKind::Bladder => self.bladder = clamped,
        }
    }

    /// Add a signed delta to one stat, clamped to `[0, 100]`.
    pub fn apply_delta(&mut self, kind: StatKind, delta: f64) {
        self.set(kind, self.get(kind) + delta);
    }

    /// Whether every stat lies within `[0, 100]`.
    pub fn in_bounds(&self) -> bool {
        StatKind::ALL
            .iter()
            .all(|k| (STAT_MIN..=STAT_MAX).contains(&self.get(*k)))
    }
}

/// A per-minute rate vector over stats, used by variable-duration
/// actions and by the ambient decay table.
pub type StatRates = BTreeMap<StatKind, f64>;

/// Intra-map navigation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Navigation {
    /// Whether the character is currently walking a path.
    pub is_moving: bool,
    /// The node path being walked (first element is the start node).
    pub path: Vec<NodeId>,
    /// Index into `path` of the edge currently being traversed.
    pub current_path_index: usize,
    /// Progress along the current edge, `[0, 1]`.
    pub progress: f64,
    /// Pixel position of the current edge's start.
    pub start_position: Option<Position>,
    /// Pixel position of the current edge's end.
    pub target_position: Option<Position>,
}

/// One intra-map leg of a cross-map route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// The map this leg runs on.
    pub map_id: MapId,
    /// Node path within the map (may be a single node when the
    /// character starts on the entrance itself).
    pub path: Vec<NodeId>,
    /// The entrance node at the end of the leg, when another leg follows.
    pub exit_entrance_id: Option<NodeId>,
}

/// Cross-map navigation state; only present while `navigation.is_moving`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossMapNavigation {
    /// The planned route, one segment per map.
    pub route: Vec<RouteSegment>,
    /// Index of the segment currently being walked.
    pub current_segment_index: usize,
}

/// The action a character is currently executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAction {
    /// Which action is running.
    pub action_id: ActionKind,
    /// World time at which the action started.
    pub start_time: WorldTime,
    /// World time at which the action completes.
    pub target_end_time: WorldTime,
    /// Facility being used, if any.
    pub facility_id: Option<FacilityId>,
    /// Conversation partner, for `talk`.
    pub target_npc_id: Option<NpcId>,
    /// Chosen duration in world minutes, for variable-duration actions.
    pub duration_minutes: Option<u32>,
}

/// An action queued to execute when the character arrives at its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Which action to run on arrival.
    pub action_id: ActionKind,
    /// Facility to use, if the action needs one.
    pub facility_id: Option<FacilityId>,
    /// Conversation partner, for `talk`.
    pub target_npc_id: Option<NpcId>,
    /// Goal for the conversation, for `talk`.
    pub conversation_goal: Option<ConversationGoal>,
    /// Requested duration in world minutes.
    pub duration_minutes: Option<u32>,
    /// Why the decider chose this action (logged, not interpreted).
    pub reason: Option<String>,
}

/// A character's employment contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employment {
    /// Facility the character works at.
    pub workplace_facility_id: FacilityId,
    /// Job title, matched against the facility's offered job.
    pub job_title: String,
}

/// One simulated character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Sprite sheet key used by rendering clients.
    pub sprite: String,
    /// Money in currency units. May go negative only through explicit
    /// costs; decay never touches it.
    pub money: i64,
    /// Interior stats, each clamped to `[0, 100]`.
    pub stats: Stats,
    /// Map the character currently occupies.
    pub current_map_id: MapId,
    /// Node the character currently occupies (last reached node while
    /// moving).
    pub current_node_id: NodeId,
    /// Pixel position (interpolated while moving).
    pub position: Position,
    /// Sprite facing direction.
    pub direction: Direction,
    /// Intra-map navigation state.
    pub navigation: Navigation,
    /// Cross-map route state; only set while `navigation.is_moving`.
    pub cross_map_navigation: Option<CrossMapNavigation>,
    /// The running action, if any.
    pub current_action: Option<CurrentAction>,
    /// Action queued for arrival, if any.
    pub pending_action: Option<PendingAction>,
    /// Active conversation session, for `talk` actions.
    pub conversation_id: Option<SessionId>,
    /// Monotonic counter stamped onto emitted log entries.
    pub action_counter: u64,
    /// Marker rendered by clients (e.g. "thinking" while a decision is
    /// in flight). Never persisted semantics; display only.
    pub display_emoji: Option<String>,
    /// Employment contract, if employed.
    pub employment: Option<Employment>,
    /// Personality description fed to the decider.
    pub personality: Option<String>,
    /// Behavioural tendencies fed to the decider.
    pub tendencies: Vec<String>,
    /// Extra prompt text for the LLM decider.
    pub custom_prompt: Option<String>,
    /// Earliest world time at which the character may re-enter
    /// deciding; set by the decision cooldown and failure back-off.
    pub next_decision_at: Option<WorldTime>,
    /// Consecutive decision failures, drives exponential back-off.
    pub decision_failures: u32,
}

impl Character {
    /// Whether the character is currently executing an action.
    pub const fn is_acting(&self) -> bool {
        self.current_action.is_some()
    }

    /// Whether the character is currently walking.
    pub const fn is_moving(&self) -> bool {
        self.navigation.is_moving
    }

    /// Whether the character is free to enter deciding: no action, not
    /// moving, and no pending action awaiting arrival.
    pub const fn is_idle(&self) -> bool {
        !self.is_acting() && !self.is_moving() && self.pending_action.is_none()
    }

    /// Bump and return the next action-counter value for log entries.
    pub const fn next_action_counter(&mut self) -> u64 {
        self.action_counter = self.action_counter.saturating_add(1);
        self.action_counter
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn stats_clamp_on_set() {
        let mut s = Stats::default();
        s.set(StatKind::Satiety, 150.0);
        assert_eq!(s.satiety, 100.0);
        s.set(StatKind::Satiety, -3.0);
        assert_eq!(s.satiety, 0.0);
    }

    #[test]
    fn stats_clamp_on_delta() {
        let mut s = Stats::default();
        s.set(StatKind::Energy, 10.0);
        s.apply_delta(StatKind::Energy, -25.0);
        assert_eq!(s.energy, 0.0);
        s.apply_delta(StatKind::Energy, 250.0);
        assert_eq!(s.energy, 100.0);
    }

    #[test]
    fn default_stats_are_full_and_in_bounds() {
        let s = Stats::default();
        assert!(s.in_bounds());
        assert_eq!(s.get(StatKind::Mood), 100.0);
    }

    #[test]
    fn action_counter_increments() {
        let mut c = test_character();
        assert_eq!(c.next_action_counter(), 1);
        assert_eq!(c.next_action_counter(), 2);
        assert_eq!(c.action_counter, 2);
    }

    #[test]
    fn idle_requires_all_substates_clear() {
        let mut c = test_character();
        assert!(c.is_idle());
        c.navigation.is_moving = true;
        assert!(!c.is_idle());
    }

    /// Minimal character for substate tests.
    fn test_character() -> Character {
        Character {
            id: CharacterId::from("alice"),
            name: String::from("Alice"),
            sprite: String::from("alice"),
            money: 1000,
            stats: Stats::default(),
            current_map_id: MapId::from("town"),
            current_node_id: NodeId::from("town-0-0"),
            position: Position::new(16.0, 16.0),
            direction: Direction::Down,
            navigation: Navigation::default(),
            cross_map_navigation: None,
            current_action: None,
            pending_action: None,
            conversation_id: None,
            action_counter: 0,
            display_emoji: None,
            employment: None,
            personality: None,
            tendencies: Vec::new(),
            custom_prompt: None,
            next_decision_at: None,
            decision_failures: 0,
        }
    }
}
