//! Map data model: nodes, obstacles, facilities.
//!
//! A [`MapDef`] is the immutable, validated form of one tile map after
//! loading. Nodes form the walkable graph; obstacles carve out space
//! and may carry a [`Facility`] that enables actions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::geometry::{PixelRect, Position};
use crate::ids::{FacilityId, MapId, NodeId, ObstacleId};

/// The role a path node plays in the navigation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Ordinary walkable grid node.
    Waypoint,
    /// Portal node linking to another map.
    Entrance,
    /// Initial placement node for characters entering the map.
    Spawn,
}

/// The far side of an entrance: the map and node a character appears at
/// after crossing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntranceLink {
    /// Destination map.
    pub map_id: MapId,
    /// Destination node on that map.
    pub node_id: NodeId,
}

/// A node in a map's navigation graph.
///
/// `connected_to` is symmetric within a map; `leads_to` is only set
/// when `kind` is [`NodeKind::Entrance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    /// Node identifier (grid nodes: `<prefix>-<row>-<col>`).
    pub id: NodeId,
    /// Pixel position of the node centre.
    pub position: Position,
    /// The node's role.
    pub kind: NodeKind,
    /// Identifiers of directly connected nodes on the same map.
    pub connected_to: BTreeSet<NodeId>,
    /// For entrances, the map/node on the other side.
    pub leads_to: Option<EntranceLink>,
    /// Optional human-readable label.
    pub label: Option<String>,
}

/// The kind of an obstacle footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    /// Solid structure; nodes inside it are removed from the graph.
    #[default]
    Building,
    /// Open region; nodes inside it remain walkable.
    Zone,
}

/// Tags describing what a facility offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityTag {
    /// Home cooking.
    Kitchen,
    /// Commercial dining.
    Restaurant,
    /// Private bath.
    Bathroom,
    /// Public hot spring.
    Hotspring,
    /// Sleeping quarters.
    Bedroom,
    /// Toilet.
    Toilet,
    /// A place of employment.
    Workspace,
    /// Open public space.
    Public,
}

/// A job a workspace facility offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job title (matched against a character's employment).
    pub title: String,
    /// Wage per worked hour, in currency units.
    pub hourly_wage: i64,
    /// Working hours as `(openingHour, closingHour)` on the 24h clock.
    pub work_hours: (u8, u8),
}

/// A facility attached to an obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Facility identifier (unique within the world).
    pub id: FacilityId,
    /// What the facility offers.
    pub tags: BTreeSet<FacilityTag>,
    /// Owning character, when the facility is private.
    pub owner: Option<crate::ids::CharacterId>,
    /// Usage cost in currency units, when the facility charges.
    pub cost: Option<i64>,
    /// Quality rating used for flavour, when configured.
    pub quality: Option<u8>,
    /// Job offered here, when the facility is a workplace.
    pub job: Option<Job>,
}

/// An obstacle on a map: a building or a zone, with tile-space and
/// pixel-space footprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Obstacle identifier.
    pub id: ObstacleId,
    /// Building or zone.
    pub kind: ObstacleKind,
    /// Top-left tile row.
    pub tile_row: u32,
    /// Top-left tile column.
    pub tile_col: u32,
    /// Width in tiles.
    pub tile_width: u32,
    /// Height in tiles.
    pub tile_height: u32,
    /// Pixel-space footprint derived from the tile rect.
    pub rect: PixelRect,
    /// Optional human-readable label.
    pub label: Option<String>,
    /// Facility offered here, if any.
    pub facility: Option<Facility>,
}

/// One validated tile map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDef {
    /// Map identifier.
    pub id: MapId,
    /// Display name.
    pub name: String,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Background fill colour (`#rrggbb`).
    pub background_color: String,
    /// Node where characters appear when entering without a target.
    pub spawn_node_id: NodeId,
    /// All nodes keyed by identifier.
    pub nodes: BTreeMap<NodeId, PathNode>,
    /// All obstacles.
    pub obstacles: Vec<Obstacle>,
    /// Prefix used for generated grid node identifiers.
    pub grid_prefix: String,
}

impl MapDef {
    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&PathNode> {
        self.nodes.get(id)
    }

    /// Iterate the entrances of this map in node-id order.
    pub fn entrances(&self) -> impl Iterator<Item = &PathNode> {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::Entrance))
    }

    /// The facility whose obstacle covers or abuts the given node, if any.
    ///
    /// Zone facilities claim the nodes inside their rect; building
    /// facilities claim nodes within one tile-width ring around the
    /// rect (the nodes a character stands on when using the building).
    pub fn facility_at(&self, node_id: &NodeId, tile_size: f64) -> Option<&Facility> {
        let node = self.nodes.get(node_id)?;
        self.obstacles.iter().find_map(|ob| {
            let facility = ob.facility.as_ref()?;
            let claimed = match ob.kind {
                ObstacleKind::Zone => ob.rect.contains(&node.position),
                ObstacleKind::Building => {
                    let ring = PixelRect {
                        x: ob.rect.x - tile_size,
                        y: ob.rect.y - tile_size,
                        width: ob.rect.width + tile_size * 2.0,
                        height: ob.rect.height + tile_size * 2.0,
                    };
                    ring.contains(&node.position) && !ob.rect.strictly_contains(&node.position)
                }
            };
            claimed.then_some(facility)
        })
    }

    /// All facilities on this map with the node sets they claim.
    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.obstacles.iter().filter_map(|ob| ob.facility.as_ref())
    }
}
