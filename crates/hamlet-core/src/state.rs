//! Authoritative world state and snapshot production.
//!
//! [`WorldState`] is exclusively owned by the engine's tick scope; all
//! mutation happens there. Observers only ever see [`WorldSnapshot`]
//! copies, whose `tick` increases strictly between publications.

use std::collections::BTreeMap;

use hamlet_types::{
    Character, CharacterId, ConversationSession, MapId, MapTransition, Npc, NpcId, SessionId,
    WorldSnapshot, WorldTime,
};

/// The authoritative entity store.
#[derive(Debug, Clone)]
pub struct WorldState {
    /// All characters keyed by id.
    pub characters: BTreeMap<CharacterId, Character>,
    /// All NPCs keyed by id.
    pub npcs: BTreeMap<NpcId, Npc>,
    /// Open conversation sessions keyed by id.
    pub sessions: BTreeMap<SessionId, ConversationSession>,
    /// The map the observer camera follows.
    pub current_map_id: MapId,
    /// Current world time (mirrors the clock after each tick).
    pub time: WorldTime,
    /// Whether the engine is paused.
    pub is_paused: bool,
    /// Map transition set while a character crosses this tick.
    pub transition: Option<MapTransition>,
    /// Tick counter (mirrors the clock after each tick).
    pub tick: u64,
}

impl WorldState {
    /// Create a world at the given start time with no entities.
    pub const fn new(current_map_id: MapId, time: WorldTime) -> Self {
        Self {
            characters: BTreeMap::new(),
            npcs: BTreeMap::new(),
            sessions: BTreeMap::new(),
            current_map_id,
            time,
            is_paused: false,
            transition: None,
            tick: 0,
        }
    }

    /// Produce a deep-immutable copy for observers.
    ///
    /// Open sessions are engine-internal and not part of the snapshot;
    /// their effects are visible through the characters and NPCs.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            time: self.time,
            current_map_id: self.current_map_id.clone(),
            is_paused: self.is_paused,
            transition: self.transition.clone(),
            characters: self.characters.clone(),
            npcs: self.npcs.clone(),
        }
    }

    /// Character ids in lexicographic order (the tick processing order).
    pub fn character_ids(&self) -> Vec<CharacterId> {
        self.characters.keys().cloned().collect()
    }

    /// Node ids occupied by NPCs on the given map (blocked for
    /// pathfinding).
    pub fn npc_blocked_nodes(&self, map_id: &MapId) -> std::collections::BTreeSet<hamlet_types::NodeId> {
        self.npcs
            .values()
            .filter(|n| n.map_id == *map_id)
            .map(|n| n.current_node_id.clone())
            .collect()
    }

    /// The active session a character participates in, if any.
    pub fn session_for_character(&self, id: &CharacterId) -> Option<&ConversationSession> {
        self.characters
            .get(id)
            .and_then(|c| c.conversation_id)
            .and_then(|sid| self.sessions.get(&sid))
    }
}
