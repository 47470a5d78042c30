//! The rule-based behaviour policy.
//!
//! A safe, LLM-free decider applied in order: urgent-stat triggers
//! (bladder, night-time energy, satiety), then the current schedule
//! entry, then idle — with a small chance of wandering to a
//! neighbouring map so a world without an LLM still shows life.

use hamlet_types::{
    ActionKind, BehaviorContext, BehaviorDecision, DecisionKind, FacilitySummary, Schedule,
};
use rand::Rng;
use tracing::debug;

use crate::decision::{BehaviorPolicy, DecisionPoll};

/// Stat thresholds driving the urgent triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleThresholds {
    /// Bladder below this forces a toilet visit.
    pub bladder: f64,
    /// Energy below this (at night) forces sleep.
    pub energy: f64,
    /// Satiety below this forces eating.
    pub satiety: f64,
    /// Night starts at this hour (inclusive).
    pub night_start_hour: u8,
    /// Night ends at this hour (exclusive).
    pub night_end_hour: u8,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            bladder: 25.0,
            energy: 25.0,
            satiety: 30.0,
            night_start_hour: 21,
            night_end_hour: 6,
        }
    }
}

/// The rule-based decider.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    thresholds: RuleThresholds,
    /// Probability of wandering to a neighbouring map when idle.
    entrance_probability: f64,
}

impl RulePolicy {
    /// Create a policy with the given thresholds and wander chance.
    pub const fn new(thresholds: RuleThresholds, entrance_probability: f64) -> Self {
        Self {
            thresholds,
            entrance_probability,
        }
    }

    /// Whether the given hour falls in the configured night range.
    const fn is_night(&self, hour: u8) -> bool {
        hour >= self.thresholds.night_start_hour || hour < self.thresholds.night_end_hour
    }

    /// Decide for one context. Pure apart from the idle wander roll.
    pub fn decide(&self, ctx: &BehaviorContext) -> BehaviorDecision {
        // 1. Urgent stat triggers, most pressing first.
        if ctx.stats.bladder < self.thresholds.bladder
            && let Some(d) = action_at_facility(ctx, ActionKind::Toilet, None, "bladder urgent")
        {
            return d;
        }
        if ctx.stats.energy < self.thresholds.energy
            && self.is_night(ctx.time.hour())
            && let Some(d) = action_at_facility(ctx, ActionKind::Sleep, None, "exhausted at night")
        {
            return d;
        }
        if ctx.stats.satiety < self.thresholds.satiety
            && let Some(d) = action_at_facility(ctx, ActionKind::Eat, None, "hungry")
        {
            return d;
        }

        // 2. Current schedule entry.
        let schedule = Schedule {
            character_id: ctx.character_id.clone(),
            day: ctx.time.day(),
            entries: ctx.schedule_today.clone(),
        };
        if let Some(entry) = hamlet_agents::due_entry(&schedule, ctx.time, &ctx.today_actions)
            && let Some(kind) = ActionKind::parse(&entry.activity)
            && let Some(d) =
                action_at_facility(ctx, kind, entry.location.as_deref(), "scheduled")
        {
            return d;
        }

        // 3. Idle, with an occasional wander through an entrance.
        let wander = self.entrance_probability > 0.0
            && rand::rng().random_bool(self.entrance_probability.clamp(0.0, 1.0));
        if wander
            && let Some(neighbor) = ctx.nearby_maps.iter().find(|m| m.hops == 1)
        {
            debug!(character = %ctx.character_id, to = %neighbor.map_id, "wandering");
            return BehaviorDecision {
                kind: DecisionKind::Move,
                action_id: None,
                target_node_id: None,
                target_map_id: Some(neighbor.map_id.clone()),
                target_npc_id: None,
                target_facility_id: None,
                conversation_goal: None,
                duration_minutes: None,
                schedule_update: None,
                reason: Some(String::from("wandering")),
            };
        }

        BehaviorDecision::idle(Some(String::from("nothing pressing")))
    }
}

impl BehaviorPolicy for RulePolicy {
    fn poll_decide(&mut self, ctx: &BehaviorContext) -> DecisionPoll {
        DecisionPoll::Ready(self.decide(ctx))
    }
}

/// Build an action decision at the closest facility supporting `kind`.
///
/// Facilities on the current map win over out-of-map ones; an explicit
/// location preference (facility id or label) is honoured when it
/// matches. Returns `None` when no facility anywhere supports the
/// action.
fn action_at_facility(
    ctx: &BehaviorContext,
    kind: ActionKind,
    location: Option<&str>,
    reason: &str,
) -> Option<BehaviorDecision> {
    let here: Vec<&FacilitySummary> = ctx
        .current_map_facilities
        .iter()
        .filter(|f| f.available_actions.contains(&kind))
        .collect();

    let preferred = location.and_then(|loc| {
        here.iter()
            .find(|f| {
                f.facility_id.as_str() == loc
                    || f.label.as_deref().is_some_and(|l| l.eq_ignore_ascii_case(loc))
            })
            .copied()
    });

    let chosen = preferred.or_else(|| here.first().copied());

    let summary = match chosen {
        Some(f) => f.clone(),
        None => {
            // Fall back to the nearest out-of-map facility.
            let mut candidates: Vec<&hamlet_types::NearbyFacility> = ctx
                .nearby_facilities
                .iter()
                .filter(|n| n.facility.available_actions.contains(&kind))
                .collect();
            candidates.sort_by_key(|n| n.hops);
            candidates.first().map(|n| n.facility.clone())?
        }
    };

    Some(BehaviorDecision {
        kind: DecisionKind::Action,
        action_id: Some(kind),
        target_node_id: Some(summary.access_node_id.clone()),
        target_map_id: Some(summary.map_id.clone()),
        target_npc_id: None,
        target_facility_id: Some(summary.facility_id),
        conversation_goal: None,
        duration_minutes: None,
        schedule_update: None,
        reason: Some(reason.to_owned()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlet_types::{FacilityTag, StatKind, WorldTime};

    use super::*;
    use crate::test_fixtures::context_with_facility;

    fn policy() -> RulePolicy {
        RulePolicy::new(RuleThresholds::default(), 0.0)
    }

    #[test]
    fn urgent_bladder_beats_schedule() {
        let mut ctx = context_with_facility("alice", FacilityTag::Toilet);
        ctx.stats.set(StatKind::Bladder, 10.0);
        ctx.schedule_today.push(hamlet_types::ScheduleEntry {
            time: String::from("00:00"),
            activity: String::from("eat"),
            location: None,
            note: None,
        });

        let d = policy().decide(&ctx);
        assert_eq!(d.action_id, Some(ActionKind::Toilet));
    }

    #[test]
    fn night_exhaustion_triggers_sleep() {
        let mut ctx = context_with_facility("alice", FacilityTag::Bedroom);
        ctx.stats.set(StatKind::Energy, 10.0);
        ctx.time = WorldTime::new(0, 23, 0).unwrap();

        let d = policy().decide(&ctx);
        assert_eq!(d.action_id, Some(ActionKind::Sleep));
    }

    #[test]
    fn daytime_exhaustion_does_not_trigger_sleep() {
        let mut ctx = context_with_facility("alice", FacilityTag::Bedroom);
        ctx.stats.set(StatKind::Energy, 10.0);
        ctx.time = WorldTime::new(0, 14, 0).unwrap();

        let d = policy().decide(&ctx);
        assert_eq!(d.kind, DecisionKind::Idle);
    }

    #[test]
    fn hunger_triggers_eat() {
        let mut ctx = context_with_facility("alice", FacilityTag::Kitchen);
        ctx.stats.set(StatKind::Satiety, 15.0);

        let d = policy().decide(&ctx);
        assert_eq!(d.action_id, Some(ActionKind::Eat));
        assert!(d.target_facility_id.is_some());
    }

    #[test]
    fn due_schedule_entry_is_followed() {
        let mut ctx = context_with_facility("alice", FacilityTag::Kitchen);
        ctx.time = WorldTime::new(0, 8, 30).unwrap();
        ctx.schedule_today.push(hamlet_types::ScheduleEntry {
            time: String::from("08:00"),
            activity: String::from("eat"),
            location: None,
            note: None,
        });

        let d = policy().decide(&ctx);
        assert_eq!(d.kind, DecisionKind::Action);
        assert_eq!(d.action_id, Some(ActionKind::Eat));
    }

    #[test]
    fn nothing_pressing_idles() {
        let ctx = context_with_facility("alice", FacilityTag::Public);
        let d = policy().decide(&ctx);
        assert_eq!(d.kind, DecisionKind::Idle);
    }

    #[test]
    fn missing_facility_falls_through_to_idle() {
        let mut ctx = context_with_facility("alice", FacilityTag::Public);
        ctx.stats.set(StatKind::Satiety, 5.0);
        // No kitchen anywhere: the hungry trigger cannot fire.
        let d = policy().decide(&ctx);
        assert_eq!(d.kind, DecisionKind::Idle);
    }
}
