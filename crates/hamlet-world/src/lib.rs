//! Maps, pathfinding, and cross-map route planning for the Hamlet
//! simulation.
//!
//! This crate owns everything spatial: loading and validating
//! `maps.json`, the [`WorldAtlas`] of immutable maps, the intra-map
//! BFS pathfinder, the cross-map route planner over the entrance
//! graph, and the facility-to-action index.

pub mod atlas;
pub mod error;
pub mod facility;
pub mod loader;
pub mod path;
pub mod route;

pub use atlas::WorldAtlas;
pub use error::{MapLoadError, WorldError};
pub use facility::{access_node, actions_for_tag, actions_for_tags, facility_summaries};
pub use loader::{load_maps_file, parse_maps};
pub use path::{are_adjacent, find_path};
pub use route::{plan_route, BlockedByMap};

/// Shared map builders for this crate's tests.
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
pub(crate) mod test_fixtures {
    use std::collections::{BTreeMap, BTreeSet};

    use hamlet_types::{
        EntranceLink, Facility, FacilityId, FacilityTag, MapDef, MapId, NodeId, NodeKind,
        Obstacle, ObstacleId, ObstacleKind, PathNode, PixelRect, Position,
    };

    use crate::atlas::WorldAtlas;

    /// Tile side used by all fixtures.
    pub const TILE: f64 = 32.0;

    /// A `rows x cols` grid map with 4-neighbour connectivity and no
    /// obstacles.
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

    /// A chain of 2x3 grid maps linked west-to-east: each map's node
    /// `<id>-1-2` becomes an entrance to the next map's `<id>-1-0`,
    /// and vice versa.
    pub fn linked_maps(ids: &[&str]) -> WorldAtlas {
        let mut maps: Vec<MapDef> = ids.iter().map(|id| grid_map(id, 2, 3)).collect();
        for i in 0..maps.len().saturating_sub(1) {
            let (left_id, right_id) = (ids[i], ids[i + 1]);
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

    /// A 4x4 grid map with one zone obstacle carrying a facility.
    pub fn grid_map_with_zone_facility(
        map_id: &str,
        facility_id: &str,
        tag: FacilityTag,
    ) -> MapDef {
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
            label: Some(String::from("fixture")),
            facility: Some(Facility {
                id: FacilityId::from(facility_id),
                tags: BTreeSet::from([tag]),
                owner: None,
                cost: None,
                quality: None,
                job: None,
            }),
        });
        map
    }
}
