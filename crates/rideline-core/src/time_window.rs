//! Wall-clock times and midnight-aware time windows.
//!
//! Rate bands are configured as `"HH:mm"` strings. They are parsed once, at
//! configuration load, into [`ClockTime`] values holding minutes since
//! midnight, so the fare calculator only ever compares integers.

use std::fmt;
use std::str::FromStr;

use chrono::Timelike;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of minutes in a day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

static CLOCK_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})$").expect("clock time regex is valid")
});

/// Errors produced while parsing a wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockTimeError {
    /// The string is not of the form `HH:mm`.
    #[error("Invalid clock time '{0}'. Expected 24-hour 'HH:mm' format (e.g., '06:30').")]
    Malformed(String),

    /// The hour or minute is outside the valid range.
    #[error("Clock time '{0}' is out of range. Hours must be 0-23 and minutes 0-59.")]
    OutOfRange(String),
}

/// Returns `true` if `value` is a valid `HH:mm` wall-clock time.
#[must_use]
pub fn is_valid_clock_time(value: &str) -> bool {
    value.parse::<ClockTime>().is_ok()
}

/// A wall-clock time of day with minute precision.
///
/// Serialized as an `"HH:mm"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// Creates a clock time from hours and minutes.
    ///
    /// Returns `None` if either component is out of range.
    #[must_use]
    pub const fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    /// Creates a clock time, wrapping hours past 23 and minutes past 59.
    #[must_use]
    pub const fn wrapping(hour: u16, minute: u16) -> Self {
        Self((hour % 24) * 60 + minute % 60)
    }

    /// Creates a clock time from minutes since midnight.
    ///
    /// Returns `None` if `minutes` is 1440 or more.
    #[must_use]
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// Takes the hour and minute of any chrono time value. Seconds are dropped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of<T: Timelike>(time: &T) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    /// Minutes since midnight, in `0..1440`.
    #[must_use]
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Hour component.
    #[must_use]
    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    /// Minute component.
    #[must_use]
    pub const fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl FromStr for ClockTime {
    type Err = ClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = CLOCK_TIME_REGEX
            .captures(trimmed)
            .ok_or_else(|| ClockTimeError::Malformed(s.to_string()))?;

        let hour: u16 = caps[1]
            .parse()
            .map_err(|_| ClockTimeError::Malformed(s.to_string()))?;
        let minute: u16 = caps[2]
            .parse()
            .map_err(|_| ClockTimeError::Malformed(s.to_string()))?;

        Self::from_hm(hour, minute).ok_or_else(|| ClockTimeError::OutOfRange(s.to_string()))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ClockTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Midnight-aware closed range test over minutes since midnight.
///
/// When `start <= end` the window is `[start, end]`. When `start > end` the
/// window crosses midnight and covers `[start, 1439] ∪ [0, end]`.
#[must_use]
pub const fn is_within_time_range(current: u16, start: u16, end: u16) -> bool {
    if start <= end {
        current >= start && current <= end
    } else {
        current >= start || current <= end
    }
}

/// A closed time-of-day window, possibly crossing midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First minute of the window (inclusive).
    pub start: ClockTime,
    /// Last minute of the window (inclusive).
    pub end: ClockTime,
}

impl TimeWindow {
    /// Creates a new window.
    #[must_use]
    pub const fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `time` falls inside the window.
    #[must_use]
    pub const fn contains(&self, time: ClockTime) -> bool {
        is_within_time_range(time.minutes(), self.start.minutes(), self.end.minutes())
    }

    /// Returns `true` if the window wraps past midnight.
    #[must_use]
    pub const fn crosses_midnight(&self) -> bool {
        self.start.minutes() > self.end.minutes()
    }

    /// Number of minutes covered by the window.
    #[must_use]
    pub const fn len_minutes(&self) -> u16 {
        if self.crosses_midnight() {
            MINUTES_PER_DAY - self.start.minutes() + self.end.minutes() + 1
        } else {
            self.end.minutes() - self.start.minutes() + 1
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Finds the runs of minutes covered by none of `windows`.
///
/// A gap spanning midnight is reported as a single window crossing midnight.
#[must_use]
pub fn uncovered_windows(windows: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut gaps: Vec<(u16, u16)> = Vec::new();
    let mut run_start: Option<u16> = None;

    for minute in 0..MINUTES_PER_DAY {
        let covered = windows
            .iter()
            .any(|w| is_within_time_range(minute, w.start.minutes(), w.end.minutes()));
        match (covered, run_start) {
            (false, None) => run_start = Some(minute),
            (true, Some(start)) => {
                gaps.push((start, minute - 1));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        gaps.push((start, MINUTES_PER_DAY - 1));
    }

    // Join the run ending at 23:59 with the one starting at 00:00.
    if gaps.len() > 1 {
        let first = gaps[0];
        let last = gaps[gaps.len() - 1];
        if first.0 == 0 && last.1 == MINUTES_PER_DAY - 1 {
            gaps.remove(0);
            let idx = gaps.len() - 1;
            gaps[idx] = (last.0, first.1);
        }
    }

    gaps.into_iter()
        .filter_map(|(start, end)| {
            Some(TimeWindow::new(
                ClockTime::from_minutes(start)?,
                ClockTime::from_minutes(end)?,
            ))
        })
        .collect()
}
