//! Serialized world snapshots published to observers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::ids::{CharacterId, MapId, NpcId};
use crate::npc::Npc;
use crate::time::WorldTime;

/// A one-tick visual fade between maps, set while a character crosses
/// a map boundary. The engine never waits on it; it exists so clients
/// can animate the crossing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTransition {
    /// The crossing character.
    pub character_id: CharacterId,
    /// Map being left.
    pub from_map_id: MapId,
    /// Map being entered.
    pub to_map_id: MapId,
}

/// A deep-immutable copy of the world published to subscribers.
///
/// `tick` increases strictly between publications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Monotonic tick counter at publication.
    pub tick: u64,
    /// World time at publication.
    pub time: WorldTime,
    /// The map the observer camera follows.
    pub current_map_id: MapId,
    /// Whether the engine is paused.
    pub is_paused: bool,
    /// In-flight map transition, if a character crossed this tick.
    pub transition: Option<MapTransition>,
    /// All characters keyed by id.
    pub characters: BTreeMap<CharacterId, Character>,
    /// All NPCs keyed by id.
    pub npcs: BTreeMap<NpcId, Npc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_roundtrips_serde() {
        let snap = WorldSnapshot {
            tick: 7,
            time: WorldTime::new(1, 8, 30).unwrap(),
            current_map_id: MapId::from("town"),
            is_paused: false,
            transition: None,
            characters: BTreeMap::new(),
            npcs: BTreeMap::new(),
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
