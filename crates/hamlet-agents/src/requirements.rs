//! Action precondition evaluation.
//!
//! Evaluation is pure: the caller assembles a [`RequirementContext`]
//! from world state and gets back either `Ok(())` or the first
//! [`RejectionReason`] that applies. Cost *affordability* is checked
//! here; the deduction itself happens at completion.

use hamlet_types::{Character, Facility};

use crate::catalog::ActionDefinition;
use crate::error::RejectionReason;

/// Everything precondition evaluation needs to know about the world.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementContext<'a> {
    /// The facility covering the character's node, if any.
    pub facility: Option<&'a Facility>,
    /// Whether the target NPC is adjacent to the character's node.
    pub npc_adjacent: bool,
    /// Whether the target NPC is free (not already conversing).
    pub npc_free: bool,
    /// Current hour of day, for work-hours gating.
    pub hour: u8,
}

/// Check every precondition of `def` for `character` in `ctx`.
///
/// Returns the first failing reason, in a fixed evaluation order:
/// facility presence, tags, ownership, stats, cost, NPC proximity and
/// availability, employment and working hours.
pub fn check_requirements(
    def: &ActionDefinition,
    character: &Character,
    ctx: &RequirementContext<'_>,
) -> Result<(), RejectionReason> {
    let req = &def.requirements;

    // Facility presence and tags.
    if !req.facility_any_of.is_empty() {
        let Some(facility) = ctx.facility else {
            return Err(RejectionReason::NoFacilityHere);
        };
        let tags_ok = req
            .facility_any_of
            .iter()
            .any(|alt| alt.iter().all(|tag| facility.tags.contains(tag)));
        if !tags_ok {
            return Err(RejectionReason::WrongFacility);
        }
        if req.ownership {
            let owned = facility
                .owner
                .as_ref()
                .is_some_and(|owner| *owner == character.id);
            if !owned {
                return Err(RejectionReason::NotOwner);
            }
        }
        // Affordability; the deduction itself happens at completion.
        if let Some(cost) = facility.cost
            && character.money < cost
        {
            return Err(RejectionReason::InsufficientMoney);
        }
    }

    // Minimum stats.
    for (kind, threshold) in &req.min_stats {
        if character.stats.get(*kind) < *threshold {
            return Err(RejectionReason::StatTooLow);
        }
    }

    // NPC proximity.
    if req.near_npc {
        if !ctx.npc_adjacent {
            return Err(RejectionReason::NpcNotAdjacent);
        }
        if !ctx.npc_free {
            return Err(RejectionReason::NpcBusy);
        }
    }

    // Employment and working hours.
    if req.employment {
        let Some(facility) = ctx.facility else {
            return Err(RejectionReason::NoFacilityHere);
        };
        let Some(job) = facility.job.as_ref() else {
            return Err(RejectionReason::NotEmployed);
        };
        let employed = character.employment.as_ref().is_some_and(|e| {
            e.workplace_facility_id == facility.id && e.job_title == job.title
        });
        if !employed {
            return Err(RejectionReason::NotEmployed);
        }
        let (open, close) = job.work_hours;
        if ctx.hour < open || ctx.hour >= close {
            return Err(RejectionReason::OutsideWorkHours);
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use hamlet_types::{
        ActionKind, CharacterId, Direction, Employment, FacilityId, FacilityTag, Job, MapId,
        Navigation, NodeId, Position, StatKind, Stats,
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

    fn kitchen() -> Facility {
        Facility {
            id: FacilityId::from("home-kitchen"),
            tags: BTreeSet::from([FacilityTag::Kitchen]),
            owner: None,
            cost: None,
            quality: None,
            job: None,
        }
    }

    fn workspace() -> Facility {
        Facility {
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
        }
    }

    #[test]
    fn eat_needs_a_facility() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Eat).unwrap();
        let result = check_requirements(def, &character(), &RequirementContext::default());
        assert_eq!(result, Err(RejectionReason::NoFacilityHere));
    }

    #[test]
    fn eat_accepts_a_kitchen() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Eat).unwrap();
        let facility = kitchen();
        let ctx = RequirementContext {
            facility: Some(&facility),
            ..RequirementContext::default()
        };
        assert_eq!(check_requirements(def, &character(), &ctx), Ok(()));
    }

    #[test]
    fn eat_rejects_wrong_tags() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Eat).unwrap();
        let mut facility = kitchen();
        facility.tags = BTreeSet::from([FacilityTag::Toilet]);
        let ctx = RequirementContext {
            facility: Some(&facility),
            ..RequirementContext::default()
        };
        assert_eq!(
            check_requirements(def, &character(), &ctx),
            Err(RejectionReason::WrongFacility)
        );
    }

    #[test]
    fn cost_requires_affordability() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Eat).unwrap();
        let mut facility = kitchen();
        facility.cost = Some(500);
        let ctx = RequirementContext {
            facility: Some(&facility),
            ..RequirementContext::default()
        };
        assert_eq!(
            check_requirements(def, &character(), &ctx),
            Err(RejectionReason::InsufficientMoney)
        );
    }

    #[test]
    fn work_requires_matching_employment_and_hours() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Work).unwrap();
        let facility = workspace();
        let mut c = character();

        let ctx = RequirementContext {
            facility: Some(&facility),
            hour: 10,
            ..RequirementContext::default()
        };
        assert_eq!(
            check_requirements(def, &c, &ctx),
            Err(RejectionReason::NotEmployed)
        );

        c.employment = Some(Employment {
            workplace_facility_id: FacilityId::from("mill"),
            job_title: String::from("miller"),
        });
        assert_eq!(check_requirements(def, &c, &ctx), Ok(()));

        let night = RequirementContext { hour: 22, ..ctx };
        assert_eq!(
            check_requirements(def, &c, &night),
            Err(RejectionReason::OutsideWorkHours)
        );
    }

    #[test]
    fn min_stats_gate() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Work).unwrap();
        let facility = workspace();
        let mut c = character();
        c.employment = Some(Employment {
            workplace_facility_id: FacilityId::from("mill"),
            job_title: String::from("miller"),
        });
        c.stats.set(StatKind::Energy, 5.0);
        let ctx = RequirementContext {
            facility: Some(&facility),
            hour: 10,
            ..RequirementContext::default()
        };
        assert_eq!(
            check_requirements(def, &c, &ctx),
            Err(RejectionReason::StatTooLow)
        );
    }

    #[test]
    fn talk_requires_free_adjacent_npc() {
        let catalog = ActionCatalog::builtin();
        let def = catalog.get(ActionKind::Talk).unwrap();
        let c = character();

        let far = RequirementContext::default();
        assert_eq!(
            check_requirements(def, &c, &far),
            Err(RejectionReason::NpcNotAdjacent)
        );

        let busy = RequirementContext {
            npc_adjacent: true,
            npc_free: false,
            ..RequirementContext::default()
        };
        assert_eq!(
            check_requirements(def, &c, &busy),
            Err(RejectionReason::NpcBusy)
        );

        let free = RequirementContext {
            npc_adjacent: true,
            npc_free: true,
            ..RequirementContext::default()
        };
        assert_eq!(check_requirements(def, &c, &free), Ok(()));
    }

    #[test]
    fn ownership_gate() {
        let catalog = ActionCatalog::builtin();
        let mut def = catalog.get(ActionKind::Eat).unwrap().clone();
        def.requirements.ownership = true;
        let mut facility = kitchen();
        facility.owner = Some(CharacterId::from("bob"));
        let ctx = RequirementContext {
            facility: Some(&facility),
            ..RequirementContext::default()
        };
        assert_eq!(
            check_requirements(&def, &character(), &ctx),
            Err(RejectionReason::NotOwner)
        );

        facility.owner = Some(CharacterId::from("alice"));
        let ctx = RequirementContext {
            facility: Some(&facility),
            ..RequirementContext::default()
        };
        assert_eq!(check_requirements(&def, &character(), &ctx), Ok(()));
    }
}
