//! Facility indexing and the tag-to-action mapping.
//!
//! Facility tags determine which actions a facility enables. The
//! mapping is fixed; action *parameters* (durations, effects) are
//! data-driven and live with the executor.

use std::collections::BTreeSet;

use hamlet_types::{ActionKind, FacilitySummary, FacilityTag, MapDef, NodeId};

/// Actions enabled by one facility tag.
pub const fn actions_for_tag(tag: FacilityTag) -> &'static [ActionKind] {
    match tag {
        FacilityTag::Kitchen | FacilityTag::Restaurant => &[ActionKind::Eat],
        FacilityTag::Bathroom | FacilityTag::Hotspring => &[ActionKind::Bathe],
        FacilityTag::Bedroom => &[ActionKind::Sleep],
        FacilityTag::Toilet => &[ActionKind::Toilet],
        FacilityTag::Workspace => &[ActionKind::Work],
        FacilityTag::Public => &[ActionKind::Rest],
    }
}

/// Deduplicated union of the actions enabled by a set of tags.
///
/// Unknown tags cannot occur (the enum is closed); an empty set yields
/// an empty list. Output order follows [`ActionKind`]'s ordering.
pub fn actions_for_tags(tags: &BTreeSet<FacilityTag>) -> Vec<ActionKind> {
    let mut set: BTreeSet<ActionKind> = BTreeSet::new();
    for tag in tags {
        for action in actions_for_tag(*tag) {
            set.insert(*action);
        }
    }
    set.into_iter().collect()
}

/// Summarise every facility on a map for the decider.
///
/// The access node is the first node (in id order) the facility claims;
/// facilities with no reachable access node are skipped.
pub fn facility_summaries(map: &MapDef, tile_size: f64) -> Vec<FacilitySummary> {
    map.facilities()
        .filter_map(|facility| {
            let access_node_id = access_node(map, tile_size, &facility.id)?;
            Some(FacilitySummary {
                facility_id: facility.id.clone(),
                map_id: map.id.clone(),
                access_node_id,
                tags: facility.tags.clone(),
                available_actions: actions_for_tags(&facility.tags),
                cost: facility.cost,
                label: facility_label(map, &facility.id),
            })
        })
        .collect()
}

/// The first node (in id order) at which the given facility is usable.
pub fn access_node(
    map: &MapDef,
    tile_size: f64,
    facility_id: &hamlet_types::FacilityId,
) -> Option<NodeId> {
    map.nodes.keys().find_map(|node_id| {
        map.facility_at(node_id, tile_size)
            .filter(|f| f.id == *facility_id)
            .map(|_f| node_id.clone())
    })
}

/// The label of the obstacle carrying the given facility, if any.
fn facility_label(map: &MapDef, facility_id: &hamlet_types::FacilityId) -> Option<String> {
    map.obstacles.iter().find_map(|ob| {
        ob.facility
            .as_ref()
            .filter(|f| f.id == *facility_id)
            .and_then(|_f| ob.label.clone())
    })
}
