use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::quiet_hours::QuietHoursConfig;

pub const DEFAULT_DAILY_LIMIT: u32 = 20;
pub const MIN_DAILY_LIMIT: u32 = 1;
pub const MAX_DAILY_LIMIT: u32 = 50;
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 300;
pub const MAX_MIN_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Clamp a requested daily limit into `1..=50`.
pub fn clamp_daily_limit(limit: i64) -> u32 {
    limit.clamp(i64::from(MIN_DAILY_LIMIT), i64::from(MAX_DAILY_LIMIT)) as u32
}

/// Clamp a requested throttle interval into `0..=86400` seconds.
pub fn clamp_min_interval(secs: u64) -> u64 {
    secs.min(MAX_MIN_INTERVAL_SECS)
}

/// Per-calendar-day send counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Local calendar day the count belongs to
    pub date: NaiveDate,
    pub sent_count: u32,
    pub limit: u32,
}

impl QuotaState {
    pub fn new(date: NaiveDate, limit: u32) -> Self {
        Self {
            date,
            sent_count: 0,
            limit: clamp_daily_limit(i64::from(limit)),
        }
    }

    /// Reset the counter if `today` differs from the stored day.
    ///
    /// This is the only place `date` changes. Returns whether a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.date = today;
        self.sent_count = 0;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.sent_count >= self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.sent_count)
    }

    pub fn set_limit(&mut self, limit: i64) -> u32 {
        self.limit = clamp_daily_limit(limit);
        self.limit
    }

    pub(crate) fn record(&mut self) {
        self.sent_count = self.sent_count.saturating_add(1);
    }
}

/// Minimum spacing between sends. Global across categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleState {
    #[serde(default)]
    pub last_sent_at: Option<DateTime<Utc>>,
    pub min_interval_secs: u64,
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self {
            last_sent_at: None,
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
        }
    }
}

impl ThrottleState {
    pub fn min_interval(&self) -> Duration {
        Duration::seconds(clamp_min_interval(self.min_interval_secs) as i64)
    }

    /// Time still to wait before the next send, if any.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_sent_at?;
        let elapsed = now - last;
        let interval = self.min_interval();
        (elapsed < interval).then(|| interval - elapsed)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now).is_some()
    }

    pub fn set_min_interval(&mut self, secs: u64) -> u64 {
        self.min_interval_secs = clamp_min_interval(secs);
        self.min_interval_secs
    }

    pub(crate) fn record(&mut self, now: DateTime<Utc>) {
        self.last_sent_at = Some(now);
    }
}

/// Everything the admission policy reads and writes. This is the durable
/// part of the engine; the queue is not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionState {
    pub quota: QuotaState,
    #[serde(default)]
    pub throttle: ThrottleState,
    #[serde(default)]
    pub quiet_hours: QuietHoursConfig,
}

impl AdmissionState {
    pub fn new(today: NaiveDate, daily_limit: u32, min_interval_secs: u64) -> Self {
        Self {
            quota: QuotaState::new(today, daily_limit),
            throttle: ThrottleState {
                last_sent_at: None,
                min_interval_secs: clamp_min_interval(min_interval_secs),
            },
            quiet_hours: QuietHoursConfig::default(),
        }
    }

    pub fn with_quiet_hours(mut self, quiet_hours: QuietHoursConfig) -> Self {
        self.quiet_hours = quiet_hours;
        self
    }

    /// Re-apply limits to values that may have been edited on disk.
    pub fn sanitize(&mut self) {
        self.quota.limit = clamp_daily_limit(i64::from(self.quota.limit));
        self.throttle.min_interval_secs = clamp_min_interval(self.throttle.min_interval_secs);
    }
}
