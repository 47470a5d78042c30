//! Intra-map shortest paths.
//!
//! Plain breadth-first search over `connected_to`, excluding blocked
//! nodes (NPC-occupied plus any caller-supplied blocks). Neighbours
//! expand in `BTreeSet` order, so results are deterministic and
//! reproducible in tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hamlet_types::{MapDef, NodeId};

/// Find the shortest node path from `from` to `to` on one map.
///
/// Returns the inclusive node sequence, or an empty list when no path
/// exists. The start node is allowed even if present in `blocked`
/// (the walker is standing on it); every other node in `blocked` is
/// impassable, including the destination.
pub fn find_path(
    map: &MapDef,
    from: &NodeId,
    to: &NodeId,
    blocked: &BTreeSet<NodeId>,
) -> Vec<NodeId> {
    if map.node(from).is_none() || map.node(to).is_none() {
        return Vec::new();
    }
    if from == to {
        return vec![from.clone()];
    }
    if blocked.contains(to) {
        return Vec::new();
    }

    let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    visited.insert(from.clone());
    queue.push_back(from.clone());

    while let Some(current) = queue.pop_front() {
        let Some(node) = map.node(&current) else {
            continue;
        };
        for neighbor in &node.connected_to {
            if visited.contains(neighbor) || blocked.contains(neighbor) {
                continue;
            }
            if map.node(neighbor).is_none() {
                continue;
            }
            visited.insert(neighbor.clone());
            parents.insert(neighbor.clone(), current.clone());
            if neighbor == to {
                return unwind(&parents, from, to);
            }
            queue.push_back(neighbor.clone());
        }
    }

    Vec::new()
}

/// Walk the BFS parent map back from `to` to `from`.
fn unwind(parents: &BTreeMap<NodeId, NodeId>, from: &NodeId, to: &NodeId) -> Vec<NodeId> {
    let mut path = vec![to.clone()];
    let mut cursor = to.clone();
    while cursor != *from {
        let Some(parent) = parents.get(&cursor) else {
            break;
        };
        path.push(parent.clone());
        cursor = parent.clone();
    }
    path.reverse();
    path
}

/// Whether two nodes are adjacent on the map's graph.
pub fn are_adjacent(map: &MapDef, a: &NodeId, b: &NodeId) -> bool {
    map.node(a).is_some_and(|n| n.connected_to.contains(b))
}
