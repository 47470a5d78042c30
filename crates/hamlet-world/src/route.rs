//! Cross-map route planning.
//!
//! A route is a list of [`RouteSegment`]s, one per map crossed. The
//! sequence of maps is the lexicographically first shortest path over
//! the entrance graph; each segment's intra-map path avoids that map's
//! blocked set. Single-node segments are retained so the simulator can
//! trigger a map transition without an intra-map walk.

use std::collections::{BTreeMap, BTreeSet};

use hamlet_types::{MapId, NodeId, RouteSegment};
use tracing::debug;

use crate::atlas::WorldAtlas;
use crate::path::find_path;

/// Per-map sets of impassable nodes.
pub type BlockedByMap = BTreeMap<MapId, BTreeSet<NodeId>>;

/// Plan a route from `(from_map, from_node)` to `(to_map, to_node)`.
///
/// Returns `None` when the maps are not connected or any leg is
/// unreachable under the blocked sets. On success:
///
/// - the first segment is on `from_map`, the last on `to_map`;
/// - every non-final segment ends on an entrance whose link equals the
///   next segment's first node;
/// - each segment's path is a valid intra-map path.
pub fn plan_route(
    atlas: &WorldAtlas,
    from_map: &MapId,
    from_node: &NodeId,
    to_map: &MapId,
    to_node: &NodeId,
    blocked: &BlockedByMap,
) -> Option<Vec<RouteSegment>> {
    let sequence = atlas.map_sequence(from_map, to_map)?;
    let empty = BTreeSet::new();

    let mut segments: Vec<RouteSegment> = Vec::new();
    let mut cursor: NodeId = from_node.clone();

    for (i, map_id) in sequence.iter().enumerate() {
        let map = atlas.map(map_id)?;
        let map_blocked = blocked.get(map_id).unwrap_or(&empty);

        let next_map = sequence.get(i.saturating_add(1));
        match next_map {
            Some(next) => {
                // Walk to the first reachable entrance leading onward.
                let mut leg: Option<(Vec<NodeId>, NodeId)> = None;
                for entrance_id in atlas.entrances_between(map_id, next) {
                    let path = find_path(map, &cursor, entrance_id, map_blocked);
                    if !path.is_empty() {
                        leg = Some((path, entrance_id.clone()));
                        break;
                    }
                }
                let (path, entrance_id) = leg?;
                let link = atlas.entrance_link(map_id, &entrance_id)?.clone();
                segments.push(RouteSegment {
                    map_id: map_id.clone(),
                    path,
                    exit_entrance_id: Some(entrance_id),
                });
                cursor = link.node_id;
            }
            None => {
                let path = find_path(map, &cursor, to_node, map_blocked);
                if path.is_empty() {
                    return None;
                }
                segments.push(RouteSegment {
                    map_id: map_id.clone(),
                    path,
                    exit_entrance_id: None,
                });
            }
        }
    }

    debug!(
        from = %from_map,
        to = %to_map,
        segments = segments.len(),
        "Route planned"
    );
    Some(segments)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_fixtures::{grid_map, linked_maps};
    use crate::WorldAtlas;

    #[test]
    fn single_map_route_is_one_segment() {
        let atlas = WorldAtlas::new(vec![grid_map("town", 4, 4)], 32.0).unwrap();
        let route = plan_route(
            &atlas,
            &MapId::from("town"),
            &NodeId::from("town-0-0"),
            &MapId::from("town"),
            &NodeId::from("town-1-1"),
            &BlockedByMap::new(),
        )
        .unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route.first().unwrap().path.len(), 3);
        assert!(route.first().unwrap().exit_entrance_id.is_none());
    }

    #[test]
    fn linear_three_map_route() {
        let atlas = linked_maps(&["mapA", "mapB", "mapC"]);
        let route = plan_route(
            &atlas,
            &MapId::from("mapA"),
            &NodeId::from("mapA-0-0"),
            &MapId::from("mapC"),
            &NodeId::from("mapC-1-1"),
            &BlockedByMap::new(),
        )
        .unwrap();

        let map_ids: Vec<_> = route.iter().map(|s| s.map_id.clone()).collect();
        assert_eq!(
            map_ids,
            vec![MapId::from("mapA"), MapId::from("mapB"), MapId::from("mapC")]
        );

        // Every non-final segment ends on an entrance whose link is the
        // next segment's first node.
        for pair in route.windows(2) {
            let (cur, next) = (pair.first().unwrap(), pair.get(1).unwrap());
            let exit = cur.exit_entrance_id.as_ref().unwrap();
            assert_eq!(cur.path.last().unwrap(), exit);
            let link = atlas.entrance_link(&cur.map_id, exit).unwrap();
            assert_eq!(&link.map_id, &next.map_id);
            assert_eq!(&link.node_id, next.path.first().unwrap());
        }
    }

    #[test]
    fn route_none_when_disconnected() {
        let a = grid_map("island", 2, 2);
        let b = grid_map("mainland", 2, 2);
        let atlas = WorldAtlas::new(vec![a, b], 32.0).unwrap();
        let route = plan_route(
            &atlas,
            &MapId::from("island"),
            &NodeId::from("island-0-0"),
            &MapId::from("mainland"),
            &NodeId::from("mainland-0-0"),
            &BlockedByMap::new(),
        );
        assert!(route.is_none());
    }

    #[test]
    fn route_none_when_final_leg_blocked() {
        let atlas = linked_maps(&["mapA", "mapB"]);
        let mut blocked = BlockedByMap::new();
        blocked.insert(
            MapId::from("mapB"),
            BTreeSet::from([NodeId::from("mapB-1-1")]),
        );
        let route = plan_route(
            &atlas,
            &MapId::from("mapA"),
            &NodeId::from("mapA-0-0"),
            &MapId::from("mapB"),
            &NodeId::from("mapB-1-1"),
            &blocked,
        );
        assert!(route.is_none());
    }

    #[test]
    fn starting_on_entrance_keeps_single_node_segment() {
        let atlas = linked_maps(&["mapA", "mapB"]);
        // mapA's eastern entrance in the fixtures is mapA-1-2.
        let route = plan_route(
            &atlas,
            &MapId::from("mapA"),
            &NodeId::from("mapA-1-2"),
            &MapId::from("mapB"),
            &NodeId::from("mapB-0-1"),
            &BlockedByMap::new(),
        )
        .unwrap();
        assert_eq!(route.first().unwrap().path.len(), 1);
        assert_eq!(
            route.first().unwrap().exit_entrance_id,
            Some(NodeId::from("mapA-1-2"))
        );
    }
}
