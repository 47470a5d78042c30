//! The tick cycle.
//!
//! Each tick runs, in order:
//!
//! 1. **Clock** — advance the tick counter and world time, clear the
//!    previous tick's map transition.
//! 2. **Day rollover** — on a new day, delete expired mid-term
//!    memories and materialise default schedules for the day.
//! 3. **Episode drain** — attach finished mini-episodes to action
//!    history and emit their log entries.
//! 4. **Stat decay** — apply drift to every character (per-minute
//!    rates of a running action replace ambient decay).
//! 5. **Characters** — advance every character's state machine in
//!    lexicographic id order.
//!
//! Snapshot publication happens in the engine, after the tick returns.
//! All character updates within one tick observe the same pre-tick
//! world time; an LLM call begun in tick T applies no earlier than
//! tick T+1.

use std::collections::BTreeMap;

use chrono::Utc;
use hamlet_agents::apply_stat_drift;
use hamlet_types::{
    ActivityLogEntry, ActivityPayload, CharacterId, Schedule, ScheduleEntry, WorldTime,
};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, SimClock};
use crate::simulate::{step_character, StepDeps};
use crate::state::WorldState;

/// Errors that abort a tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Summary of one executed tick.
#[derive(Debug)]
pub struct TickReport {
    /// The tick number that ran.
    pub tick: u64,
    /// World time after the tick.
    pub time: WorldTime,
    /// Log entries emitted during the tick.
    pub logs: Vec<ActivityLogEntry>,
}

/// Default schedules materialised at each day rollover.
pub type DefaultSchedules = BTreeMap<CharacterId, Vec<ScheduleEntry>>;

/// Execute one tick.
pub fn run_tick(
    state: &mut WorldState,
    clock: &mut SimClock,
    deps: &mut StepDeps<'_>,
    default_schedules: &DefaultSchedules,
) -> Result<TickReport, TickError> {
    let previous_day = state.time.day();

    // --- Phase 1: clock ---
    let (tick, time) = clock.advance()?;
    state.tick = tick;
    state.time = time;
    state.transition = None;

    debug!(tick, %time, "Tick started");

    // --- Phase 2: day rollover ---
    if time.day() > previous_day {
        rollover_day(state, deps, default_schedules, time.day());
    }

    // --- Phase 3: episode drain ---
    drain_episodes(state, deps);

    // --- Phase 4: stat decay ---
    let minutes = f64::from(clock.minutes_per_tick());
    for character in state.characters.values_mut() {
        let active_rates = character
            .current_action
            .as_ref()
            .and_then(|a| deps.catalog.get(a.action_id))
            .and_then(|def| def.per_minute.as_ref());
        apply_stat_drift(&mut character.stats, deps.decay, active_rates, minutes);
    }

    // --- Phase 5: characters, in id order ---
    for id in state.character_ids() {
        step_character(state, deps, &id);
    }

    let logs = std::mem::take(deps.logs);
    Ok(TickReport { tick, time, logs })
}

/// Day rollover housekeeping.
fn rollover_day(
    state: &mut WorldState,
    deps: &mut StepDeps<'_>,
    default_schedules: &DefaultSchedules,
    new_day: u32,
) {
    info!(day = new_day, "Day rollover");

    match deps.store.delete_expired_mid_term_memories(new_day) {
        Ok(removed) if removed > 0 => debug!(removed, "expired memories deleted"),
        Ok(_none) => {}
        Err(e) => warn!(error = %e, "memory cleanup failed"),
    }

    materialize_schedules(deps.store, default_schedules, state, new_day);
}

/// Upsert each character's default schedule for the given day, unless
/// one already exists (restored state keeps its plans).
pub fn materialize_schedules(
    store: &dyn hamlet_store::StateStore,
    default_schedules: &DefaultSchedules,
    state: &WorldState,
    day: u32,
) {
    for (character_id, entries) in default_schedules {
        if !state.characters.contains_key(character_id) {
            continue;
        }
        let existing = store.load_schedule(character_id, day).unwrap_or_else(|e| {
            warn!(%character_id, error = %e, "schedule read failed");
            None
        });
        if existing.is_some() {
            continue;
        }
        let mut schedule = Schedule {
            character_id: character_id.clone(),
            day,
            entries: entries.clone(),
        };
        schedule.normalize();
        if let Err(e) = store.save_schedule(&schedule) {
            warn!(%character_id, error = %e, "schedule write failed");
        }
    }
}

/// Attach finished mini-episodes and emit their logs.
fn drain_episodes(state: &mut WorldState, deps: &mut StepDeps<'_>) {
    for result in deps.episodes.drain() {
        let Some(episode) = result.episode else {
            continue;
        };
        let request = result.request;

        if let Err(e) = deps.store.update_action_history_episode(
            &request.character_id,
            request.day,
            &request.time,
            &episode.episode,
        ) {
            warn!(character = %request.character_id, error = %e, "episode attach failed");
        }

        let Some(character) = state.characters.get_mut(&request.character_id) else {
            continue;
        };

        if let Some(deltas) = episode.stat_deltas.as_ref() {
            for (kind, delta) in deltas {
                character.stats.apply_delta(*kind, *delta);
            }
        }

        let sequence = character.next_action_counter();
        deps.logs.push(ActivityLogEntry {
            timestamp: Utc::now(),
            world_time: state.time,
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            sequence,
            payload: ActivityPayload::MiniEpisode {
                action_id: request.action_id,
                episode: episode.episode,
            },
        });
    }
}
