//! Simulation clock.
//!
//! Maps the tick counter onto [`WorldTime`]: every tick advances world
//! time by a configured number of minutes. The tick number is the
//! source of truth for snapshot ordering; world time is the source of
//! truth for schedules, durations, and decay.

use hamlet_types::WorldTime;

/// Errors raised by clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid clock configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },
}

/// The engine's clock: tick counter plus derived world time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimClock {
    /// Ticks executed so far (0 before the first tick).
    tick: u64,
    /// Current world time.
    time: WorldTime,
    /// World minutes added per tick.
    minutes_per_tick: u32,
}

impl SimClock {
    /// Create a clock starting at the given world time.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] when `minutes_per_tick`
    /// is zero.
    pub fn new(start: WorldTime, minutes_per_tick: u32) -> Result<Self, ClockError> {
        if minutes_per_tick == 0 {
            return Err(ClockError::InvalidConfig {
                reason: String::from("minutes_per_tick must be at least 1"),
            });
        }
        Ok(Self {
            tick: 0,
            time: start,
            minutes_per_tick,
        })
    }

    /// Restore a clock from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] when `minutes_per_tick`
    /// is zero.
    pub fn from_parts(
        tick: u64,
        time: WorldTime,
        minutes_per_tick: u32,
    ) -> Result<Self, ClockError> {
        if minutes_per_tick == 0 {
            return Err(ClockError::InvalidConfig {
                reason: String::from("minutes_per_tick must be at least 1"),
            });
        }
        Ok(Self {
            tick,
            time,
            minutes_per_tick,
        })
    }

    /// Advance one tick. Returns the new `(tick, time)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] when the tick counter
    /// would exceed `u64::MAX`.
    pub fn advance(&mut self) -> Result<(u64, WorldTime), ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.time.advance(self.minutes_per_tick);
        Ok((self.tick, self.time))
    }

    /// Ticks executed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current world time.
    pub const fn time(&self) -> WorldTime {
        self.time
    }

    /// World minutes added per tick.
    pub const fn minutes_per_tick(&self) -> u32 {
        self.minutes_per_tick
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn advance_adds_minutes_and_bumps_tick() {
        let start = WorldTime::new(0, 8, 0).unwrap();
        let mut clock = SimClock::new(start, 5).unwrap();

        let (tick, time) = clock.advance().unwrap();
        assert_eq!(tick, 1);
        assert_eq!(time, WorldTime::new(0, 8, 5).unwrap());

        let (tick, time) = clock.advance().unwrap();
        assert_eq!(tick, 2);
        assert_eq!(time, WorldTime::new(0, 8, 10).unwrap());
    }

    #[test]
    fn world_time_carries_into_next_day() {
        let start = WorldTime::new(0, 23, 58).unwrap();
        let mut clock = SimClock::new(start, 1).unwrap();
        let _ = clock.advance().unwrap();
        let (_, time) = clock.advance().unwrap();
        assert_eq!(time, WorldTime::new(1, 0, 0).unwrap());
    }

    #[test]
    fn zero_minutes_per_tick_rejected() {
        let start = WorldTime::start_of_day_zero();
        assert!(SimClock::new(start, 0).is_err());
    }

    #[test]
    fn from_parts_restores_state() {
        let time = WorldTime::new(3, 12, 30).unwrap();
        let clock = SimClock::from_parts(500, time, 2).unwrap();
        assert_eq!(clock.tick(), 500);
        assert_eq!(clock.time(), time);
    }
}
