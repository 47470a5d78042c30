//! Action entry and completion.
//!
//! Entry is atomic: once [`enter_action`] returns, the action runs to
//! its target end time regardless of stat underruns, unless explicitly
//! cancelled. Terminal effects (completion deltas, wages, facility
//! costs) are applied in [`complete_action`]; cost deduction happens at
//! completion, never at entry.

use hamlet_types::{
    ActionKind, Character, CurrentAction, Facility, PendingAction, WorldTime,
};
use tracing::debug;

use crate::catalog::{ActionDefinition, MoneyEffect};

/// World-minute effects applied when an action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionOutcome {
    /// Net money movement (wage earned minus facility cost).
    pub money_delta: i64,
}

/// Put `character` into the given action, starting now.
///
/// The caller has already verified preconditions. Variable durations
/// are resolved against the definition's range; `talk` gets no timed
/// end (its session drives completion).
pub fn enter_action(
    character: &mut Character,
    def: &ActionDefinition,
    request: &PendingAction,
    now: WorldTime,
) -> CurrentAction {
    let duration_minutes = def.duration.resolve(request.duration_minutes);
    let target_end_time = duration_minutes.map_or(now, |m| now.plus_minutes(m));

    let action = CurrentAction {
        action_id: def.kind,
        start_time: now,
        target_end_time,
        facility_id: request.facility_id.clone(),
        target_npc_id: request.target_npc_id.clone(),
        duration_minutes,
    };

    debug!(
        character = %character.id,
        action = %def.kind,
        minutes = ?duration_minutes,
        "Action entered"
    );

    character.current_action = Some(action.clone());
    character.display_emoji = None;
    action
}

/// Apply an action's terminal effects to `character`.
///
/// `elapsed_minutes` is the actual run length (normally the resolved
/// duration; shorter if the action was cancelled and terminal effects
/// still apply). Returns the net money movement.
pub fn complete_action(
    character: &mut Character,
    def: &ActionDefinition,
    facility: Option<&Facility>,
    elapsed_minutes: u32,
) -> CompletionOutcome {
    // One-shot stat deltas.
    for (kind, delta) in &def.completion_deltas {
        character.stats.apply_delta(*kind, *delta);
    }

    // Wages and literal money effects.
    let earned: i64 = match def.money {
        MoneyEffect::None => 0,
        MoneyEffect::Literal(delta) => delta,
        MoneyEffect::HourlyWage => facility
            .and_then(|f| f.job.as_ref())
            .map_or(0, |job| {
                job.hourly_wage
                    .saturating_mul(i64::from(elapsed_minutes))
                    .checked_div(60)
                    .unwrap_or(0)
            }),
    };

    // Facility usage cost, deducted at completion.
    let cost: i64 = match def.kind {
        // Work never pays to use its own workplace.
        ActionKind::Work => 0,
        _ => facility.and_then(|f| f.cost).unwrap_or(0),
    };

    let money_delta = earned.saturating_sub(cost);
    character.money = character.money.saturating_add(money_delta);

    debug!(
        character = %character.id,
        action = %def.kind,
        money_delta,
        "Action completed"
    );

    CompletionOutcome { money_delta }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use hamlet_types::{
        CharacterId, Direction, FacilityId, FacilityTag, Job, MapId, Navigation, NodeId,
        Position, StatKind, Stats,
    };

    use super::*;
    use crate::catalog::ActionCatalog;

    fn character() -> Character {
        Character {
            id: CharacterId::from("alice"),
            name: String::from("Alice"),
            sprite: String::from("alice"),
            money: 100,
            stats: Stats::default(),
            current_map_id: MapId::from("town"),
            current_node_id: NodeId::from("town-0-0"),
            position: Position::new(16.0, 16.0),
            direction: Direction::Down,
            navigation: Navigation::default(),
            cross_map_navigation: None,
            current_action: None,
            pending_action: None,
            conversation_id: None,
            action_counter: 0,
            display_emoji: None,
            employment: None,
            personality: None,
            tendencies: Vec::new(),
            custom_prompt: None,
            next_decision_at: None,
            decision_failures: 0,
        }
    }

    fn request(kind: ActionKind, minutes: Option<u32>) -> PendingAction {
        PendingAction {
            action_id: kind,
            facility_id: Some(FacilityId::from("f")),
            target_npc_id: None,
            conversation_goal: None,
            duration_minutes: minutes,
            reason: None,
        }
    }

    #[test]
    fn entry_sets_timed_end() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Eat).unwrap();
        let mut c = character();
        let now = WorldTime::new(0, 8, 0).unwrap();

        let action = enter_action(&mut c, def, &request(ActionKind::Eat, Some(30)), now);
        assert_eq!(action.duration_minutes, Some(30));
        assert_eq!(action.target_end_time, WorldTime::new(0, 8, 30).unwrap());
        assert!(c.current_action.is_some());
    }

    #[test]
    fn talk_has_no_timed_end() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Talk).unwrap();
        let mut c = character();
        let now = WorldTime::new(0, 8, 0).unwrap();

        let action = enter_action(&mut c, def, &request(ActionKind::Talk, None), now);
        assert_eq!(action.duration_minutes, None);
        assert_eq!(action.target_end_time, now);
    }

    #[test]
    fn wage_is_prorated_per_minute() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Work).unwrap();
        let mut c = character();
        let facility = Facility {
            id: FacilityId::from("mill"),
            tags: BTreeSet::from([FacilityTag::Workspace]),
            owner: None,
            cost: None,
            quality: None,
            job: Some(Job {
                title: String::from("miller"),
                hourly_wage: 120,
                work_hours: (9, 18),
            }),
        };

        // 90 minutes at 120/h -> 180.
        let outcome = complete_action(&mut c, def, Some(&facility), 90);
        assert_eq!(outcome.money_delta, 180);
        assert_eq!(c.money, 280);
    }

    #[test]
    fn facility_cost_is_deducted_at_completion() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Eat).unwrap();
        let mut c = character();
        let facility = Facility {
            id: FacilityId::from("bakery"),
            tags: BTreeSet::from([FacilityTag::Restaurant]),
            owner: None,
            cost: Some(15),
            quality: None,
            job: None,
        };

        let outcome = complete_action(&mut c, def, Some(&facility), 30);
        assert_eq!(outcome.money_delta, -15);
        assert_eq!(c.money, 85);
    }

    #[test]
    fn completion_deltas_clamp() {
        let catalog = ActionCatalog::builtin();
        let mut def = catalog.get(ActionKind::Rest).unwrap().clone();
        def.completion_deltas
            .insert(StatKind::Mood, 500.0);
        let mut c = character();
        c.stats.set(StatKind::Mood, 10.0);

        complete_action(&mut c, &def, None, 30);
        assert!(c.stats.in_bounds());
        assert!(c.stats.mood > 99.0);
    }
}
