//! The atlas of all loaded maps and the entrance graph between them.
//!
//! Maps are immutable after load. The atlas owns the [`MapDef`]s and
//! answers the cross-map queries the route planner and the context
//! assembler need: which maps neighbour which, and through which
//! entrances.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hamlet_types::{MapDef, MapId, NodeId, NodeKind};

use crate::error::{MapLoadError, WorldError};

/// All loaded maps plus derived cross-map indexes.
#[derive(Debug, Clone)]
pub struct WorldAtlas {
    /// Maps keyed by identifier.
    maps: BTreeMap<MapId, MapDef>,
    /// Tile side length in pixels (uniform across maps).
    tile_size: f64,
}

impl WorldAtlas {
    /// Build an atlas from validated maps.
    ///
    /// # Errors
    ///
    /// Returns [`MapLoadError::DuplicateMap`] on id collision and
    /// [`MapLoadError::UnresolvedEntranceTarget`] when an entrance's
    /// `leads_to` references a map or node that does not exist.
    pub fn new(maps: Vec<MapDef>, tile_size: f64) -> Result<Self, MapLoadError> {
        let mut indexed = BTreeMap::new();
        for map in maps {
            let id = map.id.clone();
            if indexed.insert(id.clone(), map).is_some() {
                return Err(MapLoadError::DuplicateMap(id));
            }
        }

        let atlas = Self {
            maps: indexed,
            tile_size,
        };
        atlas.validate_entrance_links()?;
        Ok(atlas)
    }

    /// Every entrance's far side must resolve to a real map and node.
    fn validate_entrance_links(&self) -> Result<(), MapLoadError> {
        for map in self.maps.values() {
            for entrance in map.entrances() {
                let Some(link) = entrance.leads_to.as_ref() else {
                    continue;
                };
                let resolved = self
                    .maps
                    .get(&link.map_id)
                    .is_some_and(|target| target.nodes.contains_key(&link.node_id));
                if !resolved {
                    return Err(MapLoadError::UnresolvedEntranceTarget {
                        map_id: map.id.clone(),
                        entrance_id: entrance.id.clone(),
                        target_map: link.map_id.clone(),
                        target_node: link.node_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tile side length in pixels.
    pub const fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Look up a map.
    pub fn map(&self, id: &MapId) -> Option<&MapDef> {
        self.maps.get(id)
    }

    /// Look up a map, returning a typed error when missing.
    pub fn require_map(&self, id: &MapId) -> Result<&MapDef, WorldError> {
        self.maps
            .get(id)
            .ok_or_else(|| WorldError::UnknownMap(id.clone()))
    }

    /// Number of loaded maps.
    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    /// Iterate all maps in id order.
    pub fn maps(&self) -> impl Iterator<Item = (&MapId, &MapDef)> {
        self.maps.iter()
    }

    /// The entrances on `map_id` that lead to `to_map`, in node-id order.
    pub fn entrances_between(&self, map_id: &MapId, to_map: &MapId) -> Vec<&NodeId> {
        self.maps.get(map_id).map_or_else(Vec::new, |map| {
            map.entrances()
                .filter(|n| {
                    n.leads_to
                        .as_ref()
                        .is_some_and(|link| link.map_id == *to_map)
                })
                .map(|n| &n.id)
                .collect()
        })
    }

    /// Neighbouring maps reachable through one entrance, in map-id order.
    pub fn neighbor_maps(&self, map_id: &MapId) -> Vec<MapId> {
        let Some(map) = self.maps.get(map_id) else {
            return Vec::new();
        };
        let mut out: BTreeSet<MapId> = BTreeSet::new();
        for entrance in map.entrances() {
            if let Some(link) = entrance.leads_to.as_ref() {
                out.insert(link.map_id.clone());
            }
        }
        out.into_iter().collect()
    }

    /// Entrance-graph hop distances from `from`, up to `max_hops`.
    ///
    /// The result excludes `from` itself and is keyed by map id; BFS
    /// order guarantees minimal hop counts.
    pub fn maps_within_hops(&self, from: &MapId, max_hops: u32) -> BTreeMap<MapId, u32> {
        let mut distances: BTreeMap<MapId, u32> = BTreeMap::new();
        let mut queue: VecDeque<(MapId, u32)> = VecDeque::new();
        let mut seen: BTreeSet<MapId> = BTreeSet::new();

        seen.insert(from.clone());
        queue.push_back((from.clone(), 0));

        while let Some((map_id, hops)) = queue.pop_front() {
            if hops >= max_hops {
                continue;
            }
            let next_hops = hops.saturating_add(1);
            for neighbor in self.neighbor_maps(&map_id) {
                if seen.insert(neighbor.clone()) {
                    distances.insert(neighbor.clone(), next_hops);
                    queue.push_back((neighbor, next_hops));
                }
            }
        }

        distances
    }

    /// Shortest map-id sequence from `from` to `to` over the entrance
    /// graph, inclusive of both ends.
    ///
    /// BFS with neighbours expanded in map-id order yields the
    /// lexicographically first shortest sequence. Returns `None` when
    /// the maps are not connected.
    pub fn map_sequence(&self, from: &MapId, to: &MapId) -> Option<Vec<MapId>> {
        if from == to {
            return Some(vec![from.clone()]);
        }
        if !self.maps.contains_key(from) || !self.maps.contains_key(to) {
            return None;
        }

        let mut parents: BTreeMap<MapId, MapId> = BTreeMap::new();
        let mut queue: VecDeque<MapId> = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(map_id) = queue.pop_front() {
            for neighbor in self.neighbor_maps(&map_id) {
                if neighbor == *from || parents.contains_key(&neighbor) {
                    continue;
                }
                parents.insert(neighbor.clone(), map_id.clone());
                if neighbor == *to {
                    return Some(unwind_sequence(&parents, from, to));
                }
                queue.push_back(neighbor);
            }
        }

        None
    }

    /// Whether the given node on the given map is an entrance with a link.
    pub fn entrance_link(
        &self,
        map_id: &MapId,
        node_id: &NodeId,
    ) -> Option<&hamlet_types::EntranceLink> {
        let node = self.maps.get(map_id)?.node(node_id)?;
        if matches!(node.kind, NodeKind::Entrance) {
            node.leads_to.as_ref()
        } else {
            None
        }
    }
}

/// Walk the BFS parent map back from `to` to `from`.
fn unwind_sequence(parents: &BTreeMap<MapId, MapId>, from: &MapId, to: &MapId) -> Vec<MapId> {
    let mut sequence = vec![to.clone()];
    let mut cursor = to.clone();
    while cursor != *from {
        let Some(parent) = parents.get(&cursor) else {
            break;
        };
        sequence.push(parent.clone());
        cursor = parent.clone();
    }
    sequence.reverse();
    sequence
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_fixtures::{grid_map, linked_maps};

    #[test]
    fn duplicate_map_rejected() {
        let a = grid_map("town", 2, 2);
        let b = grid_map("town", 2, 2);
        let result = WorldAtlas::new(vec![a, b], 32.0);
        assert!(matches!(result, Err(MapLoadError::DuplicateMap(_))));
    }

    #[test]
    fn dangling_entrance_target_rejected() {
        let mut a = grid_map("town", 2, 2);
        // Point an entrance at a map that does not exist.
        let node = a.nodes.get_mut(&NodeId::from("town-0-0")).unwrap();
        node.kind = NodeKind::Entrance;
        node.leads_to = Some(hamlet_types::EntranceLink {
            map_id: MapId::from("nowhere"),
            node_id: NodeId::from("nowhere-0-0"),
        });
        let result = WorldAtlas::new(vec![a], 32.0);
        assert!(matches!(
            result,
            Err(MapLoadError::UnresolvedEntranceTarget { .. })
        ));
    }

    #[test]
    fn neighbor_maps_follow_entrances() {
        let atlas = linked_maps(&["mapA", "mapB", "mapC"]);
        assert_eq!(atlas.neighbor_maps(&MapId::from("mapA")), vec![MapId::from("mapB")]);
        let from_b = atlas.neighbor_maps(&MapId::from("mapB"));
        assert_eq!(from_b, vec![MapId::from("mapA"), MapId::from("mapC")]);
    }

    #[test]
    fn map_sequence_is_shortest() {
        let atlas = linked_maps(&["mapA", "mapB", "mapC"]);
        let seq = atlas
            .map_sequence(&MapId::from("mapA"), &MapId::from("mapC"))
            .unwrap();
        assert_eq!(
            seq,
            vec![MapId::from("mapA"), MapId::from("mapB"), MapId::from("mapC")]
        );
    }

    #[test]
    fn map_sequence_none_when_disconnected() {
        let a = grid_map("island", 2, 2);
        let b = grid_map("mainland", 2, 2);
        let atlas = WorldAtlas::new(vec![a, b], 32.0).unwrap();
        assert!(
            atlas
                .map_sequence(&MapId::from("island"), &MapId::from("mainland"))
                .is_none()
        );
    }

    #[test]
    fn maps_within_hops_respects_limit() {
        let atlas = linked_maps(&["m1", "m2", "m3", "m4", "m5"]);
        let near = atlas.maps_within_hops(&MapId::from("m1"), 3);
        assert_eq!(near.get(&MapId::from("m2")), Some(&1));
        assert_eq!(near.get(&MapId::from("m4")), Some(&3));
        assert!(!near.contains_key(&MapId::from("m5")));
        assert!(!near.contains_key(&MapId::from("m1")));
    }
}
