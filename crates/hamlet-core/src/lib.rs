//! Tick cycle, character state machine, and engine orchestration for
//! the Hamlet simulation.
//!
//! The crate's spine is [`tick::run_tick`]: a synchronous, fully
//! deterministic function (given deterministic policies) that advances
//! the clock, applies stat drift, and steps every character's state
//! machine in id order. The [`engine::Engine`] wraps it in a tokio
//! task with lifecycle control, the subscriber fan-out, and the
//! persistence cadence. Policies (rule-based here, LLM-backed in
//! `hamlet-llm`) plug in behind the traits in [`decision`].

pub mod clock;
pub mod config;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod publish;
pub mod rules;
pub mod simulate;
pub mod state;
pub mod tick;

pub use clock::{ClockError, SimClock};
pub use config::{
    BehaviorConfig, CharacterLoadError, ConfigError, LlmConfig, MovementConfig, PolicyChoice,
    WorldConfig,
};
pub use context::build_context;
pub use decision::{
    BehaviorPolicy, ConversationPolicy, DecisionPoll, EpisodePolicy, EpisodeRequest,
    EpisodeResult, MiniEpisode, PolicyFailure, TurnPoll,
};
pub use engine::{ControlAction, ControlOutcome, Engine, EngineMeta, EngineStatus, Policies};
pub use error::{EngineError, ValidationError};
pub use publish::{Publisher, Subscription};
pub use rules::{RulePolicy, RuleThresholds};
pub use simulate::{invariants_hold, step_character, StepDeps};
pub use state::WorldState;
pub use tick::{run_tick, DefaultSchedules, TickError, TickReport};

/// Shared builders for this crate's tests.
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
pub(crate) mod test_fixtures {
    use std::collections::{BTreeMap, BTreeSet};

    use hamlet_types::{
        BehaviorContext, Character, CharacterId, Direction, EntranceLink, Facility, FacilityId,
        FacilitySummary, FacilityTag, MapDef, MapId, Navigation, NodeId, NodeKind, Npc, NpcId,
        Obstacle, ObstacleId, ObstacleKind, PathNode, PixelRect, Position, Stats, WorldTime,
    };
    use hamlet_world::WorldAtlas;

    use crate::state::WorldState;

    /// Tile side used by all fixtures.
    pub const TILE: f64 = 32.0;

    /// A `rows x cols` grid map with 4-neighbour connectivity.
    pub fn grid_map(id: &str, rows: u32, cols: u32) -> MapDef {
        let mut nodes = BTreeMap::new();
        for row in 0..rows {
            for col in 0..cols {
                let node_id = NodeId::from(format!("{id}-{row}-{col}"));
                let mut connected_to = BTreeSet::new();
                if row > 0 {
                    connected_to.insert(NodeId::from(format!("{id}-{}-{col}", row - 1)));
                }
                if row + 1 < rows {
                    connected_to.insert(NodeId::from(format!("{id}-{}-{col}", row + 1)));
                }
                if col > 0 {
                    connected_to.insert(NodeId::from(format!("{id}-{row}-{}", col - 1)));
                }
                if col + 1 < cols {
                    connected_to.insert(NodeId::from(format!("{id}-{row}-{}", col + 1)));
                }
                nodes.insert(
                    node_id.clone(),
                    PathNode {
                        id: node_id,
                        position: Position::new(
                            (f64::from(col) + 0.5) * TILE,
                            (f64::from(row) + 0.5) * TILE,
                        ),
                        kind: NodeKind::Waypoint,
                        connected_to,
                        leads_to: None,
                        label: None,
                    },
                );
            }
        }
        MapDef {
            id: MapId::from(id),
            name: id.to_owned(),
            width: f64::from(cols) * TILE,
            height: f64::from(rows) * TILE,
            background_color: String::from("#446644"),
            spawn_node_id: NodeId::from(format!("{id}-0-0")),
            nodes,
            obstacles: Vec::new(),
            grid_prefix: id.to_owned(),
        }
    }

    /// One grid map wrapped in an atlas.
    pub fn single_map_atlas(id: &str, rows: u32, cols: u32) -> WorldAtlas {
        WorldAtlas::new(vec![grid_map(id, rows, cols)], TILE).unwrap()
    }

    /// A west-to-east chain of 2x3 grid maps linked by entrances.
    pub fn linked_atlas(ids: &[&str]) -> WorldAtlas {
        let mut maps: Vec<MapDef> = ids.iter().map(|id| grid_map(id, 2, 3)).collect();
        for i in 0..maps.len().saturating_sub(1) {
            let left_id = *ids.get(i).unwrap();
            let right_id = *ids.get(i + 1).unwrap();
            {
                let left = maps.get_mut(i).unwrap();
                let node = left
                    .nodes
                    .get_mut(&NodeId::from(format!("{left_id}-1-2")))
                    .unwrap();
                node.kind = NodeKind::Entrance;
                node.leads_to = Some(EntranceLink {
                    map_id: MapId::from(right_id),
                    node_id: NodeId::from(format!("{right_id}-1-0")),
                });
            }
            {
                let right = maps.get_mut(i + 1).unwrap();
                let node = right
                    .nodes
                    .get_mut(&NodeId::from(format!("{right_id}-1-0")))
                    .unwrap();
                node.kind = NodeKind::Entrance;
                node.leads_to = Some(EntranceLink {
                    map_id: MapId::from(left_id),
                    node_id: NodeId::from(format!("{left_id}-1-2")),
                });
            }
        }
        WorldAtlas::new(maps, TILE).unwrap()
    }

    /// A 4x4 map whose whole area is one zone facility with the given
    /// tag, wrapped in an atlas.
    pub fn facility_atlas(map_id: &str, facility_id: &str, tag: FacilityTag) -> WorldAtlas {
        let mut map = grid_map(map_id, 4, 4);
        map.obstacles.push(Obstacle {
            id: ObstacleId::from(facility_id),
            kind: ObstacleKind::Zone,
            tile_row: 0,
            tile_col: 0,
            tile_width: 4,
            tile_height: 4,
            rect: PixelRect {
                x: 0.0,
                y: 0.0,
                width: 4.0 * TILE,
                height: 4.0 * TILE,
            },
            label: None,
            facility: Some(Facility {
                id: FacilityId::from(facility_id),
                tags: BTreeSet::from([tag]),
                owner: None,
                cost: None,
                quality: None,
                job: None,
            }),
        });
        WorldAtlas::new(vec![map], TILE).unwrap()
    }

    /// A character standing on the given node.
    pub fn character_at(id: &str, map_id: &str, node_id: &str) -> Character {
        Character {
            id: CharacterId::from(id),
            name: id.to_owned(),
            sprite: id.to_owned(),
            money: 100,
            stats: Stats::default(),
            current_map_id: MapId::from(map_id),
            current_node_id: NodeId::from(node_id),
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

    /// A neutral NPC standing on the given node.
    pub fn npc_at(id: &str, map_id: &str, node_id: &str) -> Npc {
        Npc {
            id: NpcId::from(id),
            name: id.to_owned(),
            map_id: MapId::from(map_id),
            current_node_id: NodeId::from(node_id),
            position: Position::new(80.0, 80.0),
            direction: Direction::Down,
            personality: String::from("even-tempered"),
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

    /// A world populated with the given entities, starting at 07:00.
    pub fn world_with(characters: Vec<Character>, npcs: Vec<Npc>) -> WorldState {
        let map_id = characters
            .first()
            .map_or_else(|| MapId::from("town"), |c| c.current_map_id.clone());
        let mut state = WorldState::new(map_id, WorldTime::new(0, 7, 0).unwrap());
        for c in characters {
            state.characters.insert(c.id.clone(), c);
        }
        for n in npcs {
            state.npcs.insert(n.id.clone(), n);
        }
        state
    }

    /// A bare context with no facilities or neighbours.
    pub fn empty_context(character_id: &str) -> BehaviorContext {
        BehaviorContext {
            character_id: CharacterId::from(character_id),
            character_name: character_id.to_owned(),
            stats: Stats::default(),
            money: 100,
            map_id: MapId::from("town"),
            node_id: NodeId::from("town-0-0"),
            time: WorldTime::new(0, 12, 0).unwrap(),
            schedule_today: Vec::new(),
            available_actions: Vec::new(),
            current_map_facilities: Vec::new(),
            nearby_maps: Vec::new(),
            nearby_facilities: Vec::new(),
            nearby_npcs: Vec::new(),
            today_actions: Vec::new(),
            mid_term_memories: Vec::new(),
            personality: None,
            tendencies: Vec::new(),
            custom_prompt: None,
        }
    }

    /// A context whose current map carries one facility with the given
    /// tag (the character stands on its access node).
    pub fn context_with_facility(character_id: &str, tag: FacilityTag) -> BehaviorContext {
        let mut ctx = empty_context(character_id);
        let facility = FacilitySummary {
            facility_id: FacilityId::from("fixture"),
            map_id: ctx.map_id.clone(),
            access_node_id: ctx.node_id.clone(),
            tags: BTreeSet::from([tag]),
            available_actions: hamlet_world::actions_for_tags(&BTreeSet::from([tag])),
            cost: None,
            label: None,
        };
        ctx.available_actions = facility.available_actions.clone();
        ctx.current_map_facilities.push(facility);
        ctx
    }
}
