//! Error types for map loading and world queries.

use hamlet_types::{MapId, NodeId};

/// Errors raised while loading or validating map configuration.
///
/// Any of these aborts engine initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MapLoadError {
    /// The maps file could not be read.
    #[error("failed to read maps file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The maps file is not valid JSON of the expected shape.
    #[error("failed to parse maps JSON: {source}")]
    Json {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// Two maps share an identifier.
    #[error("duplicate map id {0}")]
    DuplicateMap(MapId),

    /// An obstacle is below the minimum footprint for its kind.
    #[error(
        "map {map_id}: obstacle {obstacle_id} is {width}x{height} tiles, \
         below the {min}x{min} minimum for its kind"
    )]
    ObstacleTooSmall {
        /// Map being validated.
        map_id: MapId,
        /// Offending obstacle.
        obstacle_id: String,
        /// Footprint width in tiles.
        width: u32,
        /// Footprint height in tiles.
        height: u32,
        /// Minimum side length for the obstacle kind.
        min: u32,
    },

    /// An obstacle declared an unknown kind string.
    #[error("map {map_id}: obstacle {obstacle_id} has invalid type {raw:?}")]
    InvalidObstacleKind {
        /// Map being validated.
        map_id: MapId,
        /// Offending obstacle.
        obstacle_id: String,
        /// The unrecognised kind string.
        raw: String,
    },

    /// A door range does not fit its wall, or spans fewer than 2 tiles.
    #[error(
        "map {map_id}: obstacle {obstacle_id} door [{start}, {end}) invalid \
         for wall length {wall_len}"
    )]
    DoorOutOfRange {
        /// Map being validated.
        map_id: MapId,
        /// Offending obstacle.
        obstacle_id: String,
        /// Door start tile offset.
        start: u32,
        /// Door end tile offset (exclusive).
        end: u32,
        /// Length of the wall the door sits on.
        wall_len: u32,
    },

    /// A `wallSides` entry is not one of top/bottom/left/right.
    #[error("map {map_id}: obstacle {obstacle_id} has invalid wall side {raw:?}")]
    InvalidWallSide {
        /// Map being validated.
        map_id: MapId,
        /// Offending obstacle.
        obstacle_id: String,
        /// The unrecognised side string.
        raw: String,
    },

    /// A label references a node that is inside a building obstacle.
    #[error("map {map_id}: label on node {node_id} lies inside building {obstacle_id}")]
    LabelInsideBuilding {
        /// Map being validated.
        map_id: MapId,
        /// Labelled node.
        node_id: NodeId,
        /// The building covering it.
        obstacle_id: String,
    },

    /// A node reference does not resolve on its map.
    #[error("map {map_id}: {role} references unknown node {node_id}")]
    UnresolvedNode {
        /// Map being validated.
        map_id: MapId,
        /// What referenced the node (spawn, entrance, label).
        role: String,
        /// The dangling node id.
        node_id: NodeId,
    },

    /// An entrance's far side references an unknown map or node.
    #[error("map {map_id}: entrance {entrance_id} leads to unknown {target_map}/{target_node}")]
    UnresolvedEntranceTarget {
        /// Map being validated.
        map_id: MapId,
        /// The entrance with the dangling link.
        entrance_id: NodeId,
        /// Target map of the link.
        target_map: MapId,
        /// Target node of the link.
        target_node: NodeId,
    },
}

/// Errors raised by world queries at runtime.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A map id did not resolve in the atlas.
    #[error("unknown map {0}")]
    UnknownMap(MapId),

    /// A node id did not resolve on its map.
    #[error("unknown node {node_id} on map {map_id}")]
    UnknownNode {
        /// Map the lookup ran against.
        map_id: MapId,
        /// The missing node.
        node_id: NodeId,
    },
}
