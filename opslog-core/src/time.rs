// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Wall clock and human-readable time helpers.
//!
//! All timestamps are Unix seconds (`i64`).

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 12 * MONTH;
const LONG_TIME: i64 = 37 * YEAR;

/// Source of "now" for entry creation and lookback windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to a settable instant, for tests and replays.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Relative phrase such as "3 hours ago" or "2 days from now".
pub fn relative_time(then: i64, now: i64) -> String {
    let suffix = if then <= now { "ago" } else { "from now" };
    let diff = i64::try_from(now.abs_diff(then)).unwrap_or(i64::MAX);

    let magnitude = match diff {
        d if d < 1 => return "now".to_string(),
        d if d < 2 => "1 second".to_string(),
        d if d < MINUTE => format!("{} seconds", d),
        d if d < 2 * MINUTE => "1 minute".to_string(),
        d if d < HOUR => format!("{} minutes", d / MINUTE),
        d if d < 2 * HOUR => "1 hour".to_string(),
        d if d < DAY => format!("{} hours", d / HOUR),
        d if d < 2 * DAY => "1 day".to_string(),
        d if d < WEEK => format!("{} days", d / DAY),
        d if d < 2 * WEEK => "1 week".to_string(),
        d if d < MONTH => format!("{} weeks", d / WEEK),
        d if d < 2 * MONTH => "1 month".to_string(),
        d if d < YEAR => format!("{} months", d / MONTH),
        d if d < 18 * MONTH => "1 year".to_string(),
        d if d < 2 * YEAR => "2 years".to_string(),
        d if d < LONG_TIME => format!("{} years", d / YEAR),
        _ => "a long while".to_string(),
    };

    format!("{} {}", magnitude, suffix)
}

/// Absolute UTC time, e.g. `Mon Jan 2 3:04:05pm`.
///
/// Out-of-range timestamps fall back to the raw number.
pub fn absolute_time(ts: i64) -> String {
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%a %b %-d %-I:%M:%S%P").to_string(),
        None => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_relative_time_ladder() {
        assert_eq!(relative_time(NOW, NOW), "now");
        assert_eq!(relative_time(NOW - 1, NOW), "1 second ago");
        assert_eq!(relative_time(NOW - 45, NOW), "45 seconds ago");
        assert_eq!(relative_time(NOW - 90, NOW), "1 minute ago");
        assert_eq!(relative_time(NOW - 5 * MINUTE, NOW), "5 minutes ago");
        assert_eq!(relative_time(NOW - 3 * HOUR, NOW), "3 hours ago");
        assert_eq!(relative_time(NOW - 36 * HOUR, NOW), "1 day ago");
        assert_eq!(relative_time(NOW - 3 * DAY, NOW), "3 days ago");
        assert_eq!(relative_time(NOW - 10 * DAY, NOW), "1 week ago");
        assert_eq!(relative_time(NOW - 3 * WEEK, NOW), "3 weeks ago");
        assert_eq!(relative_time(NOW - 45 * DAY, NOW), "1 month ago");
        assert_eq!(relative_time(NOW - 4 * MONTH, NOW), "4 months ago");
        assert_eq!(relative_time(NOW - 13 * MONTH, NOW), "1 year ago");
        assert_eq!(relative_time(NOW - 20 * MONTH, NOW), "2 years ago");
        assert_eq!(relative_time(NOW - 5 * YEAR, NOW), "5 years ago");
        assert_eq!(relative_time(0, NOW), "a long while ago");
    }

    #[test]
    fn test_relative_time_future() {
        assert_eq!(relative_time(NOW + 2 * HOUR, NOW), "2 hours from now");
    }

    #[test]
    fn test_relative_time_extreme_timestamps() {
        assert_eq!(relative_time(i64::MIN, 1_700_000_000), "a long while ago");
        assert_eq!(relative_time(i64::MAX, i64::MIN), "a long while from now");
    }

    #[test]
    fn test_absolute_time_format() {
        // 2023-11-14T22:13:20Z
        assert_eq!(absolute_time(NOW), "Tue Nov 14 10:13:20pm");
        // 2006-01-02T15:04:05Z
        assert_eq!(absolute_time(1_136_214_245), "Mon Jan 2 3:04:05pm");
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(7);
        assert_eq!(clock.now(), 7);
    }
}
