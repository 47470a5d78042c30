//! Schedule matching.
//!
//! An entry is *due* when world time has reached its clock time and no
//! action for its activity has been executed today. The rule decider
//! uses this to follow the daily plan.

use hamlet_types::{
    ActionHistoryEntry, ActionKind, Schedule, ScheduleEntry, WorldTime,
};

/// The first due entry of `schedule` at `now`, given what already ran
/// today.
///
/// Entries are scanned in time order; an entry whose activity parses
/// to an action already present in `today_actions` is considered done.
/// Entries with malformed times are skipped.
pub fn due_entry<'a>(
    schedule: &'a Schedule,
    now: WorldTime,
    today_actions: &[ActionHistoryEntry],
) -> Option<&'a ScheduleEntry> {
    schedule.entries.iter().find(|entry| {
        let Ok((hour, minute)) = entry.clock() else {
            return false;
        };
        let Ok(entry_time) = now.at_clock(hour, minute) else {
            return false;
        };
        if now < entry_time {
            return false;
        }
        match ActionKind::parse(&entry.activity) {
            Some(kind) => !today_actions.iter().any(|a| a.action_id == kind),
            // Unrecognised activities are informational only.
            None => false,
        }
    })
}
