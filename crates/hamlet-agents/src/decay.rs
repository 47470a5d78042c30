//! Per-tick stat drift.
//!
//! Stats decay by a configured per-minute rate. While a variable-
//! duration action covers a stat in its `per_minute` vector, the
//! action's rate **replaces** ambient decay for that stat (not
//! superimposed); stats the action does not cover keep decaying
//! normally. Every mutation clamps to `[0, 100]`.

use hamlet_types::{StatKind, StatRates, Stats};
use serde::Deserialize;

/// Ambient per-minute decay rates for each stat.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecayRates {
    /// Satiety lost per world minute.
    pub satiety_per_minute: f64,
    /// Energy lost per world minute.
    pub energy_per_minute: f64,
    /// Hygiene lost per world minute.
    pub hygiene_per_minute: f64,
    /// Mood lost per world minute.
    pub mood_per_minute: f64,
    /// Bladder relief lost per world minute.
    pub bladder_per_minute: f64,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            satiety_per_minute: 0.1,
            energy_per_minute: 0.08,
            hygiene_per_minute: 0.05,
            mood_per_minute: 0.02,
            bladder_per_minute: 0.12,
        }
    }
}

impl DecayRates {
    /// The decay rate for one stat.
    pub const fn rate(&self, kind: StatKind) -> f64 {
        match kind {
            StatKind::Satiety => self.satiety_per_minute,
            StatKind::Energy => self.energy_per_minute,
            StatKind::Hygiene => self.hygiene_per_minute,
            StatKind::Mood => self.mood_per_minute,
            StatKind::Bladder => self.bladder_per_minute,
        }
    }
}

/// Apply `minutes` of stat drift to one character's stats.
///
/// `active_rates` is the `per_minute` vector of the running variable-
/// duration action, when one is running. Covered stats gain
/// `rate x minutes` instead of decaying; uncovered stats lose
/// `decay x minutes`.
pub fn apply_stat_drift(
    stats: &mut Stats,
    decay: &DecayRates,
    active_rates: Option<&StatRates>,
    minutes: f64,
) {
    for kind in StatKind::ALL {
        let delta = active_rates
            .and_then(|rates| rates.get(&kind))
            .map_or_else(|| -decay.rate(kind) * minutes, |rate| rate * minutes);
        stats.apply_delta(kind, delta);
    }
}
