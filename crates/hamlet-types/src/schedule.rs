//! Daily schedules.
//!
//! Each character has at most one [`Schedule`] per day, holding entries
//! sorted ascending by clock time. An entry is *due* when world time
//! has reached it and no action for it has been executed today.

use serde::{Deserialize, Serialize};

use crate::ids::CharacterId;
use crate::time::{TimeError, WorldTime};

/// One planned activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Clock time as `"HH:MM"`.
    pub time: String,
    /// Activity identifier (usually an action id).
    pub activity: String,
    /// Where to perform it (facility id or map label), when relevant.
    pub location: Option<String>,
    /// Free-form note shown to the decider.
    pub note: Option<String>,
}

impl ScheduleEntry {
    /// Parse this entry's clock time.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when the `time` field is malformed.
    pub fn clock(&self) -> Result<(u8, u8), TimeError> {
        WorldTime::parse_clock(&self.time)
    }
}

/// A character's schedule for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Owning character.
    pub character_id: CharacterId,
    /// Day this schedule applies to.
    pub day: u32,
    /// Entries sorted ascending by time.
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Create an empty schedule for a day.
    pub const fn empty(character_id: CharacterId, day: u32) -> Self {
        Self {
            character_id,
            day,
            entries: Vec::new(),
        }
    }

    /// Re-sort entries ascending by clock time. Entries with malformed
    /// times sort last, preserving their relative order.
    pub fn normalize(&mut self) {
        self.entries
            .sort_by_key(|e| e.clock().map_or(u64::MAX, |(h, m)| {
                u64::from(h).saturating_mul(60).saturating_add(u64::from(m))
            }));
    }
}

/// A mutation the decider may request against today's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScheduleUpdate {
    /// Insert a new entry.
    Add {
        /// The entry to insert.
        entry: ScheduleEntry,
    },
    /// Replace the entry at the given time.
    Modify {
        /// Clock time (`"HH:MM"`) of the entry to replace.
        time: String,
        /// The replacement entry.
        entry: ScheduleEntry,
    },
    /// Remove the entry at the given time.
    Remove {
        /// Clock time (`"HH:MM"`) of the entry to remove.
        time: String,
    },
}

impl Schedule {
    /// Apply one update, keeping entries sorted.
    ///
    /// `Modify` and `Remove` are no-ops when no entry matches the time.
    pub fn apply_update(&mut self, update: ScheduleUpdate) {
        match update {
            ScheduleUpdate::Add { entry } => self.entries.push(entry),
            ScheduleUpdate::Modify { time, entry } => {
                if let Some(slot) = self.entries.iter_mut().find(|e| e.time == time) {
                    *slot = entry;
                }
            }
            ScheduleUpdate::Remove { time } => {
                self.entries.retain(|e| e.time != time);
            }
        }
        self.normalize();
    }
}
