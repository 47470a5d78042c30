//! Navigation advancement.
//!
//! Characters walk node paths with pixel interpolation: each tick adds
//! `delta_seconds x speed / edge_distance` to `progress`, snapping to
//! the next node whenever progress reaches 1 and carrying leftover
//! distance into the following edge within the same tick. Reaching the
//! end of a segment either crosses a map boundary (one crossing per
//! tick) or finishes the route.

use hamlet_types::{Character, CrossMapNavigation, Direction, MapId, Navigation, RouteSegment};
use hamlet_world::WorldAtlas;
use tracing::debug;

use crate::error::AgentError;

/// Distances below this are treated as already-arrived edges.
const EDGE_EPSILON: f64 = 1e-6;

/// What happened during one tick of navigation advancement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdvanceOutcome {
    /// Set when the character crossed to another map this tick.
    pub crossed: Option<(MapId, MapId)>,
    /// Whether the whole route finished this tick.
    pub arrived: bool,
}

/// Start walking a planned route.
///
/// The first segment must start at the character's current node.
/// Multi-segment routes keep their full plan in
/// `cross_map_navigation`; single-segment routes only use `navigation`.
pub fn begin_route(
    character: &mut Character,
    atlas: &WorldAtlas,
    route: Vec<RouteSegment>,
) -> Result<(), AgentError> {
    let Some(first) = route.first() else {
        return Ok(());
    };

    let first_path = first.path.clone();
    character.cross_map_navigation = if route.len() > 1 {
        Some(CrossMapNavigation {
            route,
            current_segment_index: 0,
        })
    } else {
        None
    };

    begin_segment(character, atlas, first_path)
}

/// Initialise `navigation` for one intra-map path.
fn begin_segment(
    character: &mut Character,
    atlas: &WorldAtlas,
    path: Vec<hamlet_types::NodeId>,
) -> Result<(), AgentError> {
    let map = atlas
        .require_map(&character.current_map_id)
        .map_err(|_e| AgentError::DanglingNavigation {
            map_id: character.current_map_id.clone(),
            node_id: character.current_node_id.clone(),
        })?;

    let start_id = path.first().cloned();
    let start_position = start_id
        .as_ref()
        .and_then(|id| map.node(id))
        .map(|n| n.position);
    let target_position = path
        .get(1)
        .and_then(|id| map.node(id))
        .map(|n| n.position);

    let Some(start_position) = start_position else {
        return Err(AgentError::DanglingNavigation {
            map_id: character.current_map_id.clone(),
            node_id: start_id.unwrap_or_else(|| character.current_node_id.clone()),
        });
    };

    character.position = start_position;
    if let Some(target) = target_position {
        character.direction = Direction::from_movement(&start_position, &target);
    }
    character.navigation = Navigation {
        is_moving: true,
        path,
        current_path_index: 0,
        progress: 0.0,
        start_position: Some(start_position),
        target_position,
    };
    Ok(())
}

/// Advance a moving character by one tick of wall time.
///
/// `speed` is pixels per real second. At most one map crossing happens
/// per tick; the crossing consumes the remainder of the tick's
/// movement budget.
pub fn advance(
    character: &mut Character,
    atlas: &WorldAtlas,
    delta_seconds: f64,
    speed: f64,
) -> Result<AdvanceOutcome, AgentError> {
    if !character.navigation.is_moving {
        return Ok(AdvanceOutcome::default());
    }

    let mut budget = delta_seconds * speed;

    loop {
        let last_index = character.navigation.path.len().saturating_sub(1);
        if character.navigation.current_path_index >= last_index {
            return end_of_segment(character, atlas);
        }

        let (start, target) = edge_endpoints(character, atlas)?;
        let distance = start.distance_to(&target);

        if distance <= EDGE_EPSILON {
            snap_to_next_node(character, atlas, target)?;
            continue;
        }

        let needed = (1.0 - character.navigation.progress) * distance;
        if budget + EDGE_EPSILON >= needed {
            budget -= needed;
            snap_to_next_node(character, atlas, target)?;
            continue;
        }

        character.navigation.progress += budget / distance;
        character.position = start.lerp(&target, character.navigation.progress);
        character.direction = Direction::from_movement(&start, &target);
        return Ok(AdvanceOutcome::default());
    }
}

/// Resolve the current edge's start and target pixel positions.
fn edge_endpoints(
    character: &Character,
    atlas: &WorldAtlas,
) -> Result<(hamlet_types::Position, hamlet_types::Position), AgentError> {
    let nav = &character.navigation;
    if let (Some(start), Some(target)) = (nav.start_position, nav.target_position) {
        return Ok((start, target));
    }

    // Recompute from the path when the cached endpoints are absent
    // (restored state).
    let map = atlas
        .require_map(&character.current_map_id)
        .map_err(|_e| AgentError::DanglingNavigation {
            map_id: character.current_map_id.clone(),
            node_id: character.current_node_id.clone(),
        })?;
    let lookup = |offset: usize| {
        nav.path
            .get(nav.current_path_index.saturating_add(offset))
            .and_then(|id| map.node(id))
            .map(|n| n.position)
            .ok_or_else(|| AgentError::DanglingNavigation {
                map_id: character.current_map_id.clone(),
                node_id: character.current_node_id.clone(),
            })
    };
    Ok((lookup(0)?, lookup(1)?))
}

/// Snap onto the next node of the current path.
fn snap_to_next_node(
    character: &mut Character,
    atlas: &WorldAtlas,
    reached: hamlet_types::Position,
) -> Result<(), AgentError> {
    character.navigation.current_path_index =
        character.navigation.current_path_index.saturating_add(1);
    character.navigation.progress = 0.0;
    character.position = reached;

    let Some(node_id) = character
        .navigation
        .path
        .get(character.navigation.current_path_index)
        .cloned()
    else {
        return Err(AgentError::DanglingNavigation {
            map_id: character.current_map_id.clone(),
            node_id: character.current_node_id.clone(),
        });
    };
    character.current_node_id = node_id;

    // Prepare the next edge, if one remains.
    let map = atlas
        .require_map(&character.current_map_id)
        .map_err(|_e| AgentError::DanglingNavigation {
            map_id: character.current_map_id.clone(),
            node_id: character.current_node_id.clone(),
        })?;
    let next = character
        .navigation
        .path
        .get(character.navigation.current_path_index.saturating_add(1))
        .and_then(|id| map.node(id))
        .map(|n| n.position);
    character.navigation.start_position = Some(reached);
    character.navigation.target_position = next;
    if let Some(target) = next {
        character.direction = Direction::from_movement(&reached, &target);
    }
    Ok(())
}

/// Handle reaching the last node of the current segment: either cross
/// to the next map or finish the route.
fn end_of_segment(
    character: &mut Character,
    atlas: &WorldAtlas,
) -> Result<AdvanceOutcome, AgentError> {
    let crossing = character.cross_map_navigation.as_ref().and_then(|cross| {
        let segment = cross.route.get(cross.current_segment_index)?;
        let entrance = segment.exit_entrance_id.as_ref()?;
        let link = atlas.entrance_link(&segment.map_id, entrance)?;
        let next = cross
            .route
            .get(cross.current_segment_index.saturating_add(1))?;
        Some((link.clone(), next.path.clone()))
    });

    match crossing {
        Some((link, next_path)) => {
            let from = character.current_map_id.clone();
            character.current_map_id = link.map_id.clone();
            character.current_node_id = link.node_id;
            if let Some(cross) = character.cross_map_navigation.as_mut() {
                cross.current_segment_index = cross.current_segment_index.saturating_add(1);
            }
            begin_segment(character, atlas, next_path)?;
            debug!(
                character = %character.id,
                from = %from,
                to = %character.current_map_id,
                "Map boundary crossed"
            );
            Ok(AdvanceOutcome {
                crossed: Some((from, character.current_map_id.clone())),
                arrived: false,
            })
        }
        None => {
            if let Some(last) = character.navigation.path.last().cloned() {
                character.current_node_id = last;
            }
            character.navigation = Navigation::default();
            character.cross_map_navigation = None;
            Ok(AdvanceOutcome {
                crossed: None,
                arrived: true,
            })
        }
    }
}
