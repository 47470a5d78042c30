//! The data-driven action catalogue.
//!
//! Every action the engine recognises has an [`ActionDefinition`]
//! describing its facility requirements, its duration model, and its
//! effects. Built-in defaults cover all actions; world configuration
//! may override durations, rates, and effects per action.

use std::collections::{BTreeMap, BTreeSet};

use hamlet_types::{ActionKind, FacilityTag, StatKind, StatRates};
use serde::Deserialize;

/// How long an action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationSpec {
    /// Always exactly this many world minutes.
    Fixed(u32),
    /// Caller-chosen within `[min, max]`, `default` when unspecified.
    Range {
        /// Minimum minutes.
        min: u32,
        /// Maximum minutes.
        max: u32,
        /// Minutes used when the decider does not choose.
        default: u32,
    },
    /// Runs until its conversation session closes.
    Session,
}

impl DurationSpec {
    /// Resolve a requested duration against this spec.
    ///
    /// `Fixed` ignores the request; `Range` clamps it (or uses the
    /// default); `Session` yields `None`.
    pub fn resolve(&self, requested: Option<u32>) -> Option<u32> {
        match self {
            Self::Fixed(minutes) => Some(*minutes),
            Self::Range { min, max, default } => {
                Some(requested.map_or(*default, |r| r.clamp(*min, *max)))
            }
            Self::Session => None,
        }
    }
}

/// How an action moves money at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoneyEffect {
    /// No direct money movement (facility costs still apply).
    #[default]
    None,
    /// A literal signed delta.
    Literal(i64),
    /// Earn the facility job's hourly wage, prorated by the minutes
    /// worked.
    HourlyWage,
}

/// Facility and state preconditions for entering an action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Requirements {
    /// Acceptable facility tag combinations: the facility must carry
    /// every tag of at least one alternative. Empty means no facility
    /// is needed.
    pub facility_any_of: Vec<BTreeSet<FacilityTag>>,
    /// The character must own the facility.
    pub ownership: bool,
    /// Minimum stat thresholds.
    pub min_stats: BTreeMap<StatKind, f64>,
    /// The target NPC must be adjacent on the navigation graph.
    pub near_npc: bool,
    /// The character must be employed at the facility, and the
    /// facility's job must cover the current hour.
    pub employment: bool,
}

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    /// The action this entry defines.
    pub kind: ActionKind,
    /// Entry preconditions.
    pub requirements: Requirements,
    /// Duration model.
    pub duration: DurationSpec,
    /// Stat deltas applied once at completion.
    pub completion_deltas: StatRates,
    /// Money movement at completion.
    pub money: MoneyEffect,
    /// Per-minute rates that replace ambient decay while running.
    pub per_minute: Option<StatRates>,
    /// World minutes between conversation turns (only `talk`).
    pub turn_interval_minutes: u32,
}

/// Per-action configuration overrides (see world config `actions`).
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionOverride {
    /// Replace a fixed duration.
    pub duration: Option<u32>,
    /// Replace a duration range.
    pub duration_range: Option<DurationRangeOverride>,
    /// Replace the per-minute rate vector.
    pub per_minute: Option<BTreeMap<StatKind, f64>>,
    /// Replace the completion deltas.
    pub effects: Option<BTreeMap<StatKind, f64>>,
    /// Replace the conversation turn interval.
    pub turn_interval_minutes: Option<u32>,
}

/// Raw duration-range override shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationRangeOverride {
    /// Minimum minutes.
    pub min: u32,
    /// Maximum minutes.
    pub max: u32,
    /// Default minutes.
    pub default: u32,
}

/// The full catalogue, ready for lookup by the executor and deciders.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    entries: BTreeMap<ActionKind, ActionDefinition>,
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ActionCatalog {
    /// The built-in catalogue with default numbers.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        for def in builtin_definitions() {
            entries.insert(def.kind, def);
        }
        Self { entries }
    }

    /// Build the catalogue with configuration overrides applied on top
    /// of the built-in defaults. Unknown action ids are ignored.
    pub fn with_overrides(overrides: &BTreeMap<String, ActionOverride>) -> Self {
        let mut catalog = Self::builtin();
        for (raw_id, over) in overrides {
            let Some(kind) = ActionKind::parse(raw_id) else {
                continue;
            };
            let Some(def) = catalog.entries.get_mut(&kind) else {
                continue;
            };
            if let Some(minutes) = over.duration {
                def.duration = DurationSpec::Fixed(minutes);
            }
            if let Some(range) = over.duration_range {
                def.duration = DurationSpec::Range {
                    min: range.min,
                    max: range.max,
                    default: range.default,
                };
            }
            if let Some(rates) = over.per_minute.clone() {
                def.per_minute = Some(rates);
            }
            if let Some(deltas) = over.effects.clone() {
                def.completion_deltas = deltas;
            }
            if let Some(interval) = over.turn_interval_minutes {
                def.turn_interval_minutes = interval;
            }
        }
        catalog
    }

    /// Look up one action's definition.
    pub fn get(&self, kind: ActionKind) -> Option<&ActionDefinition> {
        self.entries.get(&kind)
    }

    /// Iterate all definitions in [`ActionKind`] order.
    pub fn definitions(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.entries.values()
    }
}

/// The built-in defaults for every recognised action.
fn builtin_definitions() -> Vec<ActionDefinition> {
    let mut defs = Vec::new();

    defs.push(ActionDefinition {
        kind: ActionKind::Eat,
        requirements: Requirements {
            facility_any_of: vec![
                BTreeSet::from([FacilityTag::Kitchen]),
                BTreeSet::from([FacilityTag::Restaurant]),
            ],
            ..Requirements::default()
        },
        duration: DurationSpec::Range {
            min: 15,
            max: 60,
            default: 30,
        },
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        per_minute: Some(BTreeMap::from([(StatKind::Satiety, 1.67)])),
        turn_interval_minutes: 0,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Sleep,
        requirements: Requirements {
            facility_any_of: vec![BTreeSet::from([FacilityTag::Bedroom])],
            ..Requirements::default()
        },
        duration: DurationSpec::Range {
            min: 60,
            max: 600,
            default: 480,
        },
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        per_minute: Some(BTreeMap::from([
            (StatKind::Energy, 0.2),
            (StatKind::Mood, 0.02),
        ])),
        turn_interval_minutes: 0,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Bathe,
        requirements: Requirements {
            facility_any_of: vec![
                BTreeSet::from([FacilityTag::Bathroom]),
                BTreeSet::from([FacilityTag::Hotspring]),
            ],
            ..Requirements::default()
        },
        duration: DurationSpec::Range {
            min: 15,
            max: 60,
            default: 30,
        },
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        per_minute: Some(BTreeMap::from([(StatKind::Hygiene, 2.5)])),
        turn_interval_minutes: 0,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Toilet,
        requirements: Requirements {
            facility_any_of: vec![BTreeSet::from([FacilityTag::Toilet])],
            ..Requirements::default()
        },
        duration: DurationSpec::Range {
            min: 3,
            max: 10,
            default: 5,
        },
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        // 5 default minutes at +20/min drives bladder to full.
        per_minute: Some(BTreeMap::from([(StatKind::Bladder, 20.0)])),
        turn_interval_minutes: 0,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Rest,
        requirements: Requirements {
            facility_any_of: vec![BTreeSet::from([FacilityTag::Public])],
            ..Requirements::default()
        },
        duration: DurationSpec::Range {
            min: 10,
            max: 120,
            default: 30,
        },
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        per_minute: Some(BTreeMap::from([(StatKind::Mood, 0.5)])),
        turn_interval_minutes: 0,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Work,
        requirements: Requirements {
            facility_any_of: vec![BTreeSet::from([FacilityTag::Workspace])],
            employment: true,
            min_stats: BTreeMap::from([(StatKind::Energy, 10.0)]),
            ..Requirements::default()
        },
        duration: DurationSpec::Range {
            min: 60,
            max: 540,
            default: 480,
        },
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::HourlyWage,
        per_minute: Some(BTreeMap::from([
            (StatKind::Energy, -0.2),
            (StatKind::Mood, -0.05),
        ])),
        turn_interval_minutes: 0,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Talk,
        requirements: Requirements {
            near_npc: true,
            ..Requirements::default()
        },
        duration: DurationSpec::Session,
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        per_minute: None,
        turn_interval_minutes: 1,
    });

    defs.push(ActionDefinition {
        kind: ActionKind::Thinking,
        requirements: Requirements::default(),
        duration: DurationSpec::Fixed(0),
        completion_deltas: BTreeMap::new(),
        money: MoneyEffect::None,
        per_minute: None,
        turn_interval_minutes: 0,
    });

    defs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_persistable_action() {
        let catalog = ActionCatalog::builtin();
        for kind in ActionKind::PERSISTABLE {
            assert!(catalog.get(kind).is_some(), "missing {kind}");
        }
    }

    #[test]
    fn range_duration_clamps_requests() {
        let catalog = ActionCatalog::builtin();
        let eat = catalog.get(ActionKind::Eat).unwrap();
        assert_eq!(eat.duration.resolve(None), Some(30));
        assert_eq!(eat.duration.resolve(Some(5)), Some(15));
        assert_eq!(eat.duration.resolve(Some(45)), Some(45));
        assert_eq!(eat.duration.resolve(Some(500)), Some(60));
    }

    #[test]
    fn session_duration_resolves_to_none() {
        let catalog = ActionCatalog::builtin();
        let talk = catalog.get(ActionKind::Talk).unwrap();
        assert_eq!(talk.duration.resolve(Some(10)), None);
    }

    #[test]
    fn overrides_replace_rates_and_ranges() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            String::from("eat"),
            ActionOverride {
                duration_range: Some(DurationRangeOverride {
                    min: 10,
                    max: 20,
                    default: 15,
                }),
                per_minute: Some(BTreeMap::from([(StatKind::Satiety, 3.0)])),
                ..ActionOverride::default()
            },
        );
        let catalog = ActionCatalog::with_overrides(&overrides);
        let eat = catalog.get(ActionKind::Eat).unwrap();
        assert_eq!(eat.duration.resolve(None), Some(15));
        let rates = eat.per_minute.as_ref().unwrap();
        assert!(rates.get(&StatKind::Satiety).copied().unwrap() > 2.9);
    }

    #[test]
    fn unknown_override_ids_are_ignored() {
        let mut overrides = BTreeMap::new();
        overrides.insert(String::from("juggle"), ActionOverride::default());
        let catalog = ActionCatalog::with_overrides(&overrides);
        assert!(catalog.get(ActionKind::Eat).is_some());
    }

    #[test]
    fn eat_accepts_kitchen_or_restaurant() {
        let catalog = ActionCatalog::builtin();
        let eat = catalog.get(ActionKind::Eat).unwrap();
        assert_eq!(eat.requirements.facility_any_of.len(), 2);
    }
}
