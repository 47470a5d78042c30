//! Map configuration loading (`maps.json`).
//!
//! The file is an array of raw map definitions. Loading proceeds in
//! three steps per map: generate the walkable grid from the `grid`
//! block, carve out building interiors and wire entrances, then
//! validate every rule the engine depends on. Any violation aborts
//! initialisation with a [`MapLoadError`] naming the offender.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use hamlet_types::{
    EntranceLink, Facility, FacilityId, FacilityTag, Job, MapDef, MapId, NodeId, NodeKind,
    Obstacle, ObstacleId, ObstacleKind, PathNode, PixelRect, Position,
};

use crate::error::MapLoadError;

/// Minimum side length, in tiles, of a building obstacle.
const MIN_BUILDING_SIDE: u32 = 2;

/// Minimum side length, in tiles, of a zone obstacle.
const MIN_ZONE_SIDE: u32 = 4;

/// Minimum door span in tiles.
const MIN_DOOR_SPAN: u32 = 2;

// ---------------------------------------------------------------------------
// Raw JSON shapes
// ---------------------------------------------------------------------------

/// Grid block: generates `rows x cols` waypoints named
/// `<prefix>-<row>-<col>` with 4-neighbour connectivity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrid {
    prefix: String,
    cols: u32,
    rows: u32,
}

/// A label attached to a node.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLabel {
    node_id: String,
    label: String,
    #[serde(default, rename = "type")]
    _kind: Option<String>,
}

/// The far side of an entrance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeadsTo {
    map_id: String,
    node_id: String,
}

/// An entrance definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntrance {
    id: String,
    row: u32,
    col: u32,
    connected_node_ids: Vec<String>,
    leads_to: RawLeadsTo,
    #[serde(default)]
    label: Option<String>,
}

/// A door cut into an obstacle wall (validated, not kept at runtime —
/// door geometry is a rendering concern).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDoor {
    side: String,
    start: u32,
    end: u32,
}

/// A job offered by a workspace facility.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJob {
    title: String,
    hourly_wage: i64,
    #[serde(default = "default_work_hours")]
    work_hours: (u8, u8),
}

const fn default_work_hours() -> (u8, u8) {
    (9, 18)
}

/// A facility attached to an obstacle.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFacility {
    #[serde(default)]
    id: Option<String>,
    tags: Vec<FacilityTag>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    cost: Option<i64>,
    #[serde(default)]
    quality: Option<u8>,
    #[serde(default)]
    job: Option<RawJob>,
}

/// An obstacle definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObstacle {
    #[serde(default)]
    id: Option<String>,
    row: u32,
    col: u32,
    tile_width: u32,
    tile_height: u32,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    facility: Option<RawFacility>,
    #[serde(default)]
    door: Option<RawDoor>,
    #[serde(default)]
    wall_sides: Option<Vec<String>>,
}

/// One raw map definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMap {
    id: String,
    name: String,
    width: f64,
    height: f64,
    background_color: String,
    spawn_node_id: String,
    grid: RawGrid,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    entrances: Vec<RawEntrance>,
    #[serde(default)]
    obstacles: Vec<RawObstacle>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate every map from a `maps.json` file.
pub fn load_maps_file(path: &Path, tile_size: f64) -> Result<Vec<MapDef>, MapLoadError> {
    let contents = std::fs::read_to_string(path)?;
    let maps = parse_maps(&contents, tile_size)?;
    info!(path = %path.display(), maps = maps.len(), "Maps loaded");
    Ok(maps)
}

/// Parse and validate every map from a JSON string.
pub fn parse_maps(json: &str, tile_size: f64) -> Result<Vec<MapDef>, MapLoadError> {
    let raw_maps: Vec<RawMap> = serde_json::from_str(json)?;
    raw_maps
        .into_iter()
        .map(|raw| build_map(raw, tile_size))
        .collect()
}

/// Pixel centre of the tile at `(row, col)`.
fn tile_center(row: u32, col: u32, tile_size: f64) -> Position {
    Position::new(
        (f64::from(col) + 0.5) * tile_size,
        (f64::from(row) + 0.5) * tile_size,
    )
}

/// Build one validated [`MapDef`] from its raw definition.
#[allow(clippy::too_many_lines)]
fn build_map(raw: RawMap, tile_size: f64) -> Result<MapDef, MapLoadError> {
    let map_id = MapId::from(raw.id.as_str());

    // --- Obstacles first: validation plus footprints. ---
    let mut obstacles: Vec<Obstacle> = Vec::new();
    for (index, raw_ob) in raw.obstacles.into_iter().enumerate() {
        let obstacle_id = raw_ob
            .id
            .clone()
            .unwrap_or_else(|| format!("ob-{index}"));
        let kind = parse_obstacle_kind(&map_id, &obstacle_id, raw_ob.kind.as_deref())?;

        let min = match kind {
            ObstacleKind::Building => MIN_BUILDING_SIDE,
            ObstacleKind::Zone => MIN_ZONE_SIDE,
        };
        if raw_ob.tile_width < min || raw_ob.tile_height < min {
            return Err(MapLoadError::ObstacleTooSmall {
                map_id,
                obstacle_id,
                width: raw_ob.tile_width,
                height: raw_ob.tile_height,
                min,
            });
        }

        if let Some(door) = raw_ob.door.as_ref() {
            validate_door(&map_id, &obstacle_id, door, raw_ob.tile_width, raw_ob.tile_height)?;
        }
        if let Some(sides) = raw_ob.wall_sides.as_ref() {
            for side in sides {
                if !matches!(side.as_str(), "top" | "bottom" | "left" | "right") {
                    return Err(MapLoadError::InvalidWallSide {
                        map_id,
                        obstacle_id,
                        raw: side.clone(),
                    });
                }
            }
        }

        let rect = PixelRect {
            x: f64::from(raw_ob.col) * tile_size,
            y: f64::from(raw_ob.row) * tile_size,
            width: f64::from(raw_ob.tile_width) * tile_size,
            height: f64::from(raw_ob.tile_height) * tile_size,
        };

        let facility = raw_ob.facility.map(|f| Facility {
            id: FacilityId::from(f.id.unwrap_or_else(|| obstacle_id.clone())),
            tags: f.tags.into_iter().collect(),
            owner: f.owner.map(|o| hamlet_types::CharacterId::from(o.as_str())),
            cost: f.cost,
            quality: f.quality,
            job: f.job.map(|j| Job {
                title: j.title,
                hourly_wage: j.hourly_wage,
                work_hours: j.work_hours,
            }),
        });

        obstacles.push(Obstacle {
            id: ObstacleId::from(obstacle_id.as_str()),
            kind,
            tile_row: raw_ob.row,
            tile_col: raw_ob.col,
            tile_width: raw_ob.tile_width,
            tile_height: raw_ob.tile_height,
            rect,
            label: raw_ob.label,
            facility,
        });
    }

    // --- Grid nodes, skipping building interiors. ---
    let mut nodes: BTreeMap<NodeId, PathNode> = BTreeMap::new();
    for row in 0..raw.grid.rows {
        for col in 0..raw.grid.cols {
            let position = tile_center(row, col, tile_size);
            if inside_building(&obstacles, &position).is_some() {
                continue;
            }
            let id = NodeId::from(format!("{}-{row}-{col}", raw.grid.prefix));
            let mut connected_to: BTreeSet<NodeId> = BTreeSet::new();
            for (nr, nc) in grid_neighbors(row, col, raw.grid.rows, raw.grid.cols) {
                let npos = tile_center(nr, nc, tile_size);
                if inside_building(&obstacles, &npos).is_none() {
                    connected_to.insert(NodeId::from(format!(
                        "{}-{nr}-{nc}",
                        raw.grid.prefix
                    )));
                }
            }
            nodes.insert(
                id.clone(),
                PathNode {
                    id,
                    position,
                    kind: NodeKind::Waypoint,
                    connected_to,
                    leads_to: None,
                    label: None,
                },
            );
        }
    }

    // --- Entrances: connect both directions. ---
    for raw_entrance in raw.entrances {
        let entrance_id = NodeId::from(raw_entrance.id.as_str());
        let mut connected_to: BTreeSet<NodeId> = BTreeSet::new();
        for connected in &raw_entrance.connected_node_ids {
            let connected_id = NodeId::from(connected.as_str());
            let Some(node) = nodes.get_mut(&connected_id) else {
                return Err(MapLoadError::UnresolvedNode {
                    map_id,
                    role: format!("entrance {}", raw_entrance.id),
                    node_id: connected_id,
                });
            };
            node.connected_to.insert(entrance_id.clone());
            connected_to.insert(connected_id);
        }
        nodes.insert(
            entrance_id.clone(),
            PathNode {
                id: entrance_id,
                position: tile_center(raw_entrance.row, raw_entrance.col, tile_size),
                kind: NodeKind::Entrance,
                connected_to,
                leads_to: Some(EntranceLink {
                    map_id: MapId::from(raw_entrance.leads_to.map_id.as_str()),
                    node_id: NodeId::from(raw_entrance.leads_to.node_id.as_str()),
                }),
                label: raw_entrance.label,
            },
        );
    }

    // --- Labels: must land on surviving nodes. ---
    for raw_label in raw.labels {
        let node_id = NodeId::from(raw_label.node_id.as_str());
        match nodes.get_mut(&node_id) {
            Some(node) => node.label = Some(raw_label.label),
            None => {
                // Distinguish "swallowed by a building" from "never existed".
                let position = grid_node_position(&raw.grid, &node_id, tile_size);
                if let Some(building) =
                    position.and_then(|p| inside_building(&obstacles, &p))
                {
                    return Err(MapLoadError::LabelInsideBuilding {
                        map_id,
                        node_id,
                        obstacle_id: building.id.to_string(),
                    });
                }
                return Err(MapLoadError::UnresolvedNode {
                    map_id,
                    role: String::from("label"),
                    node_id,
                });
            }
        }
    }

    // --- Spawn node must resolve; mark it. ---
    let spawn_node_id = NodeId::from(raw.spawn_node_id.as_str());
    match nodes.get_mut(&spawn_node_id) {
        Some(node) => {
            if matches!(node.kind, NodeKind::Waypoint) {
                node.kind = NodeKind::Spawn;
            }
        }
        None => {
            return Err(MapLoadError::UnresolvedNode {
                map_id,
                role: String::from("spawnNodeId"),
                node_id: spawn_node_id,
            });
        }
    }

    Ok(MapDef {
        id: map_id,
        name: raw.name,
        width: raw.width,
        height: raw.height,
        background_color: raw.background_color,
        spawn_node_id,
        nodes,
        obstacles,
        grid_prefix: raw.grid.prefix,
    })
}

/// Parse an obstacle kind string (absent means building).
fn parse_obstacle_kind(
    map_id: &MapId,
    obstacle_id: &str,
    raw: Option<&str>,
) -> Result<ObstacleKind, MapLoadError> {
    match raw {
        None | Some("building") => Ok(ObstacleKind::Building),
        Some("zone") => Ok(ObstacleKind::Zone),
        Some(other) => Err(MapLoadError::InvalidObstacleKind {
            map_id: map_id.clone(),
            obstacle_id: obstacle_id.to_owned(),
            raw: other.to_owned(),
        }),
    }
}

/// Door span must lie within the wall and cover at least two tiles.
fn validate_door(
    map_id: &MapId,
    obstacle_id: &str,
    door: &RawDoor,
    tile_width: u32,
    tile_height: u32,
) -> Result<(), MapLoadError> {
    let wall_len = match door.side.as_str() {
        "top" | "bottom" => tile_width,
        "left" | "right" => tile_height,
        other => {
            return Err(MapLoadError::InvalidWallSide {
                map_id: map_id.clone(),
                obstacle_id: obstacle_id.to_owned(),
                raw: other.to_owned(),
            });
        }
    };
    let span = door.end.saturating_sub(door.start);
    if door.end > wall_len || door.start >= door.end || span < MIN_DOOR_SPAN {
        return Err(MapLoadError::DoorOutOfRange {
            map_id: map_id.clone(),
            obstacle_id: obstacle_id.to_owned(),
            start: door.start,
            end: door.end,
            wall_len,
        });
    }
    Ok(())
}

/// The building (not zone) covering a position, if any.
fn inside_building<'a>(obstacles: &'a [Obstacle], position: &Position) -> Option<&'a Obstacle> {
    obstacles
        .iter()
        .find(|ob| matches!(ob.kind, ObstacleKind::Building) && ob.rect.contains(position))
}

/// 4-neighbour coordinates within the grid bounds.
fn grid_neighbors(row: u32, col: u32, rows: u32, cols: u32) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    if row > 0 {
        out.push((row.saturating_sub(1), col));
    }
    if row.saturating_add(1) < rows {
        out.push((row.saturating_add(1), col));
    }
    if col > 0 {
        out.push((row, col.saturating_sub(1)));
    }
    if col.saturating_add(1) < cols {
        out.push((row, col.saturating_add(1)));
    }
    out
}

/// Recover the grid position of a `<prefix>-<row>-<col>` node id, used
/// to diagnose labels pointing into buildings.
fn grid_node_position(grid: &RawGrid, node_id: &NodeId, tile_size: f64) -> Option<Position> {
    let rest = node_id.as_str().strip_prefix(grid.prefix.as_str())?;
    let rest = rest.strip_prefix('-')?;
    let (row_s, col_s) = rest.split_once('-')?;
    let row: u32 = row_s.parse().ok()?;
    let col: u32 = col_s.parse().ok()?;
    Some(tile_center(row, col, tile_size))
}
