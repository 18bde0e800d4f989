//! Quiet hours ("do not disturb") window.
//!
//! Times are wall-clock readings in the engine's configured time zone. A
//! window whose start is later than its end wraps midnight, e.g.
//! 22:00 - 08:00. A window with `start == end` is empty.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clock::local_instant;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Quiet hours configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHoursConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(with = "hhmm", default = "default_start")]
    pub start: NaiveTime,
    #[serde(with = "hhmm", default = "default_end")]
    pub end: NaiveTime,
}

fn default_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_end() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: default_start(),
            end: default_end(),
        }
    }
}

impl QuietHoursConfig {
    /// Enabled window from `start` to `end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            enabled: true,
            start,
            end,
        }
    }

    /// Enabled window from minutes-of-day. Values past midnight wrap.
    pub fn from_minutes(start: u32, end: u32) -> Self {
        Self::new(time_of_minutes(start), time_of_minutes(end))
    }

    /// Same window, disabled.
    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    pub fn start_minutes(&self) -> u32 {
        minutes_of(self.start)
    }

    pub fn end_minutes(&self) -> u32 {
        minutes_of(self.end)
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start_minutes() > self.end_minutes()
    }

    /// Pure containment test on a minutes-of-day value.
    pub fn contains_minute(&self, minute: u32) -> bool {
        let (start, end) = (self.start_minutes(), self.end_minutes());
        if start <= end {
            start <= minute && minute < end
        } else {
            minute >= start || minute < end
        }
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of_minutes(minutes: u32) -> NaiveTime {
    let m = minutes % MINUTES_PER_DAY;
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// Evaluates a [`QuietHoursConfig`] against instants in a time zone.
#[derive(Debug, Clone, Copy)]
pub struct QuietHoursCalculator {
    timezone: Tz,
}

impl QuietHoursCalculator {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Whether `now` falls inside the window. Always false when disabled.
    pub fn is_active(&self, config: &QuietHoursConfig, now: DateTime<Utc>) -> bool {
        if !config.enabled {
            return false;
        }
        let local = now.with_timezone(&self.timezone);
        config.contains_minute(local.hour() * 60 + local.minute())
    }

    /// Next instant at which the window ends, strictly after `now`.
    ///
    /// `None` when quiet hours are not active.
    pub fn end_instant(&self, config: &QuietHoursConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.is_active(config, now) {
            return None;
        }
        let today = now.with_timezone(&self.timezone).date_naive();
        match local_instant(&self.timezone, today, config.end) {
            Some(end) if end > now => Some(end),
            _ => local_instant(&self.timezone, today.succ_opt()?, config.end),
        }
    }

    /// Time left until the window ends. `None` when not active.
    pub fn time_until_end(&self, config: &QuietHoursConfig, now: DateTime<Utc>) -> Option<Duration> {
        self.end_instant(config, now).map(|end| end - now)
    }

    /// [`Self::time_until_end`] in whole seconds.
    pub fn seconds_until_end(&self, config: &QuietHoursConfig, now: DateTime<Utc>) -> Option<i64> {
        self.time_until_end(config, now).map(|d| d.num_seconds())
    }
}

/// `"HH:MM"` serde representation for [`NaiveTime`]. Seconds are accepted on
/// input and dropped.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .map_err(|e| de::Error::custom(format!("invalid time of day '{raw}': {e}")))
    }
}
