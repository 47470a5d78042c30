//! Behaviour context assembly.
//!
//! Builds the [`BehaviorContext`] a decider receives: current stats
//! and location, today's schedule and history, executable actions,
//! facilities here and within three entrance-graph hops, and nearby
//! NPCs. Store read failures degrade to empty sections rather than
//! blocking the decision.

use hamlet_store::StateStore;
use hamlet_types::{
    ActionKind, BehaviorContext, Character, NearbyFacility, NearbyMap, NpcSummary,
};
use hamlet_world::{are_adjacent, facility_summaries, WorldAtlas};
use tracing::warn;

use hamlet_agents::catalog::ActionCatalog;

use crate::state::WorldState;

/// Entrance-graph radius for the nearby-maps section.
const NEARBY_HOPS: u32 = 3;

/// Assemble the decision context for one character.
pub fn build_context(
    state: &WorldState,
    atlas: &WorldAtlas,
    _catalog: &ActionCatalog,
    store: &dyn StateStore,
    character: &Character,
) -> BehaviorContext {
    let day = state.time.day();
    let tile = atlas.tile_size();

    let schedule_today = store
        .load_schedule(&character.id, day)
        .unwrap_or_else(|e| {
            warn!(character = %character.id, error = %e, "schedule read failed");
            None
        })
        .map(|s| s.entries)
        .unwrap_or_default();

    let today_actions = store
        .load_action_history_for_day(&character.id, day)
        .unwrap_or_else(|e| {
            warn!(character = %character.id, error = %e, "history read failed");
            Vec::new()
        });

    let mid_term_memories = store
        .load_active_mid_term_memories(&character.id, day)
        .unwrap_or_else(|e| {
            warn!(character = %character.id, error = %e, "memory read failed");
            Vec::new()
        });

    let map = atlas.map(&character.current_map_id);

    // Actions executable right where the character stands.
    let mut available_actions: Vec<ActionKind> = map
        .and_then(|m| m.facility_at(&character.current_node_id, tile))
        .map(|f| hamlet_world::actions_for_tags(&f.tags))
        .unwrap_or_default();

    // NPCs on this map; talk becomes available next to a free one.
    let nearby_npcs: Vec<NpcSummary> = state
        .npcs
        .values()
        .filter(|n| n.map_id == character.current_map_id)
        .map(|n| NpcSummary {
            npc_id: n.id.clone(),
            name: n.name.clone(),
            node_id: n.current_node_id.clone(),
            affinity: n.affinity,
            mood: n.mood.clone(),
            in_conversation: n.in_conversation,
        })
        .collect();

    let talk_possible = map.is_some_and(|m| {
        nearby_npcs.iter().any(|n| {
            !n.in_conversation && are_adjacent(m, &character.current_node_id, &n.node_id)
        })
    });
    if talk_possible && !available_actions.contains(&ActionKind::Talk) {
        available_actions.push(ActionKind::Talk);
    }

    let current_map_facilities = map
        .map(|m| facility_summaries(m, tile))
        .unwrap_or_default();

    let hop_map = atlas.maps_within_hops(&character.current_map_id, NEARBY_HOPS);
    let nearby_maps: Vec<NearbyMap> = hop_map
        .iter()
        .filter_map(|(map_id, hops)| {
            atlas.map(map_id).map(|m| NearbyMap {
                map_id: map_id.clone(),
                name: m.name.clone(),
                hops: *hops,
            })
        })
        .collect();

    let nearby_facilities: Vec<NearbyFacility> = hop_map
        .iter()
        .filter_map(|(map_id, hops)| atlas.map(map_id).map(|m| (m, *hops)))
        .flat_map(|(m, hops)| {
            facility_summaries(m, tile)
                .into_iter()
                .map(move |facility| NearbyFacility { facility, hops })
        })
        .collect();

    BehaviorContext {
        character_id: character.id.clone(),
        character_name: character.name.clone(),
        stats: character.stats,
        money: character.money,
        map_id: character.current_map_id.clone(),
        node_id: character.current_node_id.clone(),
        time: state.time,
        schedule_today,
        available_actions,
        current_map_facilities,
        nearby_maps,
        nearby_facilities,
        nearby_npcs,
        today_actions,
        mid_term_memories,
        personality: character.personality.clone(),
        tendencies: character.tendencies.clone(),
        custom_prompt: character.custom_prompt.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlet_store::MemoryStore;
    use hamlet_types::{MapId, Schedule, ScheduleEntry, WorldTime};

    use super::*;
    use crate::test_fixtures::{
        character_at, facility_atlas, linked_atlas, npc_at, world_with,
    };

    #[test]
    fn context_carries_facility_actions() {
        let atlas = facility_atlas("home", "home-kitchen", hamlet_types::FacilityTag::Kitchen);
        let character = character_at("alice", "home", "home-1-1");
        let state = world_with(vec![character.clone()], vec![]);
        let store = MemoryStore::new();

        let ctx = build_context(
            &state,
            &atlas,
            &ActionCatalog::builtin(),
            &store,
            &character,
        );
        assert!(ctx.available_actions.contains(&ActionKind::Eat));
        assert_eq!(ctx.current_map_facilities.len(), 1);
    }

    #[test]
    fn talk_appears_next_to_free_npc() {
        let atlas = facility_atlas("home", "home-kitchen", hamlet_types::FacilityTag::Kitchen);
        let character = character_at("alice", "home", "home-1-1");
        let npc = npc_at("baker", "home", "home-1-2");
        let state = world_with(vec![character.clone()], vec![npc]);
        let store = MemoryStore::new();

        let ctx = build_context(
            &state,
            &atlas,
            &ActionCatalog::builtin(),
            &store,
            &character,
        );
        assert!(ctx.available_actions.contains(&ActionKind::Talk));
        assert_eq!(ctx.nearby_npcs.len(), 1);
    }

    #[test]
    fn busy_npc_does_not_enable_talk() {
        let atlas = facility_atlas("home", "home-kitchen", hamlet_types::FacilityTag::Kitchen);
        let character = character_at("alice", "home", "home-1-1");
        let mut npc = npc_at("baker", "home", "home-1-2");
        npc.in_conversation = true;
        let state = world_with(vec![character.clone()], vec![npc]);
        let store = MemoryStore::new();

        let ctx = build_context(
            &state,
            &atlas,
            &ActionCatalog::builtin(),
            &store,
            &character,
        );
        assert!(!ctx.available_actions.contains(&ActionKind::Talk));
    }

    #[test]
    fn nearby_maps_respect_three_hops() {
        let atlas = linked_atlas(&["m1", "m2", "m3", "m4", "m5"]);
        let character = character_at("alice", "m1", "m1-0-0");
        let state = world_with(vec![character.clone()], vec![]);
        let store = MemoryStore::new();

        let ctx = build_context(
            &state,
            &atlas,
            &ActionCatalog::builtin(),
            &store,
            &character,
        );
        let ids: Vec<&MapId> = ctx.nearby_maps.iter().map(|m| &m.map_id).collect();
        assert!(ids.contains(&&MapId::from("m4")));
        assert!(!ids.contains(&&MapId::from("m5")));
    }

    #[test]
    fn schedule_and_history_come_from_store() {
        let atlas = facility_atlas("home", "home-kitchen", hamlet_types::FacilityTag::Kitchen);
        let character = character_at("alice", "home", "home-1-1");
        let mut state = world_with(vec![character.clone()], vec![]);
        state.time = WorldTime::new(2, 9, 0).unwrap();
        let store = MemoryStore::new();

        let mut schedule = Schedule::empty(character.id.clone(), 2);
        schedule.entries.push(ScheduleEntry {
            time: String::from("08:00"),
            activity: String::from("eat"),
            location: None,
            note: None,
        });
        hamlet_store::StateStore::save_schedule(&store, &schedule).unwrap();

        let ctx = build_context(
            &state,
            &atlas,
            &ActionCatalog::builtin(),
            &store,
            &character,
        );
        assert_eq!(ctx.schedule_today.len(), 1);
        assert!(ctx.today_actions.is_empty());
    }
}
