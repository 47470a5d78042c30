//! Simulated world time.
//!
//! [`WorldTime`] is a `(day, hour, minute)` triple that advances
//! monotonically: minutes carry into hours, hours into days. Equality
//! and ordering are by total minutes since day 0, which the derived
//! lexicographic ordering over `(day, hour, minute)` preserves.
//!
//! All arithmetic uses checked or saturating operations; the day
//! counter saturates at `u32::MAX` rather than wrapping.

use serde::{Deserialize, Serialize};

/// Minutes in one hour.
const MINUTES_PER_HOUR: u64 = 60;

/// Minutes in one day.
const MINUTES_PER_DAY: u64 = 1440;

/// Errors raised by [`WorldTime`] construction and parsing.
#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    /// Hour or minute component out of range.
    #[error("time component out of range: hour {hour}, minute {minute}")]
    ComponentOutOfRange {
        /// The offending hour value.
        hour: u8,
        /// The offending minute value.
        minute: u8,
    },

    /// A `"HH:MM"` string did not parse.
    #[error("malformed clock string {raw:?} (expected \"HH:MM\")")]
    MalformedClock {
        /// The string that failed to parse.
        raw: String,
    },
}

/// A point in simulated time: day number plus a 24-hour clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct WorldTime {
    /// Day counter, starting at 0.
    day: u32,
    /// Hour of day, `0..=23`.
    hour: u8,
    /// Minute of hour, `0..=59`.
    minute: u8,
}

impl WorldTime {
    /// Construct a world time from components.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::ComponentOutOfRange`] if `hour > 23` or
    /// `minute > 59`.
    pub const fn new(day: u32, hour: u8, minute: u8) -> Result<Self, TimeError> {
        if hour >= 24 || minute >= 60 {
            return Err(TimeError::ComponentOutOfRange { hour, minute });
        }
        Ok(Self { day, hour, minute })
    }

    /// The very start of day 0.
    pub const fn start_of_day_zero() -> Self {
        Self {
            day: 0,
            hour: 0,
            minute: 0,
        }
    }

    /// Day counter (0-based).
    pub const fn day(&self) -> u32 {
        self.day
    }

    /// Hour of day (`0..=23`).
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute of hour (`0..=59`).
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Total minutes elapsed since `day 0, 00:00`.
    pub const fn total_minutes(&self) -> u64 {
        let days = (self.day as u64).saturating_mul(MINUTES_PER_DAY);
        let hours = (self.hour as u64).saturating_mul(MINUTES_PER_HOUR);
        days.saturating_add(hours).saturating_add(self.minute as u64)
    }

    /// Minutes elapsed since midnight of the current day.
    pub const fn minutes_of_day(&self) -> u64 {
        (self.hour as u64)
            .saturating_mul(MINUTES_PER_HOUR)
            .saturating_add(self.minute as u64)
    }

    /// Return a copy advanced by the given number of minutes.
    ///
    /// Carries minutes into hours into days. The day counter saturates
    /// at `u32::MAX` instead of wrapping.
    pub fn plus_minutes(&self, minutes: u32) -> Self {
        let total = self.minutes_of_day().saturating_add(u64::from(minutes));
        // MINUTES_PER_DAY is a non-zero constant; div/rem cannot panic.
        let extra_days = total / MINUTES_PER_DAY;
        let of_day = total % MINUTES_PER_DAY;

        let extra = u32::try_from(extra_days).unwrap_or(u32::MAX);
        let day = self.day.saturating_add(extra);

        // of_day < 1440 by construction, so both components fit u8.
        let hour = u8::try_from(of_day / MINUTES_PER_HOUR).unwrap_or(0);
        let minute = u8::try_from(of_day % MINUTES_PER_HOUR).unwrap_or(0);

        Self { day, hour, minute }
    }

    /// Advance this time in place by the given number of minutes.
    pub fn advance(&mut self, minutes: u32) {
        *self = self.plus_minutes(minutes);
    }

    /// Return a copy on the same day with the clock set from an
    /// `(hour, minute)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::ComponentOutOfRange`] for invalid components.
    pub const fn at_clock(&self, hour: u8, minute: u8) -> Result<Self, TimeError> {
        Self::new(self.day, hour, minute)
    }

    /// Whole minutes from `self` to `later`, or 0 if `later` is earlier.
    pub const fn minutes_until(&self, later: &Self) -> u64 {
        later.total_minutes().saturating_sub(self.total_minutes())
    }

    /// Parse a `"HH:MM"` clock string into `(hour, minute)`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::MalformedClock`] on any syntactic problem
    /// and [`TimeError::ComponentOutOfRange`] for valid syntax with
    /// out-of-range components.
    pub fn parse_clock(raw: &str) -> Result<(u8, u8), TimeError> {
        let malformed = || TimeError::MalformedClock { raw: raw.to_owned() };
        let (h, m) = raw.split_once(':').ok_or_else(malformed)?;
        let hour: u8 = h.parse().map_err(|_e| malformed())?;
        let minute: u8 = m.parse().map_err(|_e| malformed())?;
        if hour >= 24 || minute >= 60 {
            return Err(TimeError::ComponentOutOfRange { hour, minute });
        }
        Ok((hour, minute))
    }

    /// Format the clock portion as `"HH:MM"`.
    pub fn clock_string(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl core::fmt::Display for WorldTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "day {} {:02}:{:02}", self.day, self.hour, self.minute)
    }
}
