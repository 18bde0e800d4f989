use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::state::AdmissionState;
use crate::priority::Priority;
use crate::quiet_hours::QuietHoursCalculator;

/// Which checks a critical notification may skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalBypass {
    #[serde(default)]
    pub quota: bool,
    #[serde(default)]
    pub throttle: bool,
    #[serde(default)]
    pub quiet_hours: bool,
}

impl CriticalBypass {
    /// Critical is treated like every other level.
    pub const NONE: CriticalBypass = CriticalBypass {
        quota: false,
        throttle: false,
        quiet_hours: false,
    };

    /// Critical skips every check.
    pub const FULL: CriticalBypass = CriticalBypass {
        quota: true,
        throttle: true,
        quiet_hours: true,
    };
}

/// Where an admission request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPath {
    /// A producer asking to deliver right now.
    Immediate,
    /// The periodic drain of the admission queue.
    QueueDrain,
}

/// Why a notification may not go out now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    QuotaExceeded { sent: u32, limit: u32 },
    Throttled { retry_in_secs: i64 },
    QuietHours { remaining_secs: i64 },
}

impl Denial {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Denial::QuotaExceeded { .. } => "quota-exceeded",
            Denial::Throttled { .. } => "throttled",
            Denial::QuietHours { .. } => "quiet-hours-active",
        }
    }

    pub fn is_quiet_hours(&self) -> bool {
        matches!(self, Denial::QuietHours { .. })
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::QuotaExceeded { sent, limit } => {
                write!(f, "quota-exceeded: {sent}/{limit} sent today")
            }
            Denial::Throttled { retry_in_secs } => {
                write!(f, "throttled: retry in {retry_in_secs}s")
            }
            Denial::QuietHours { remaining_secs } => write!(
                f,
                "quiet-hours-active: will send in {} minutes",
                remaining_secs / 60
            ),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "denials", rename_all = "snake_case")]
pub enum Admission {
    Allow,
    /// Every failing check, in evaluation order (quota, throttle, quiet
    /// hours). Never empty.
    Deny(Vec<Denial>),
}

impl Admission {
    fn from_denials(denials: Vec<Denial>) -> Self {
        if denials.is_empty() {
            Admission::Allow
        } else {
            Admission::Deny(denials)
        }
    }

    pub fn can_send(&self) -> bool {
        matches!(self, Admission::Allow)
    }

    pub fn denials(&self) -> &[Denial] {
        match self {
            Admission::Allow => &[],
            Admission::Deny(denials) => denials,
        }
    }

    /// Human-readable reason, `None` when allowed.
    pub fn reason(&self) -> Option<String> {
        match self {
            Admission::Allow => None,
            Admission::Deny(denials) => Some(
                denials
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }

    /// Denied by quiet hours alone; quota and throttle would allow it.
    pub fn only_quiet_hours(&self) -> bool {
        match self {
            Admission::Allow => false,
            Admission::Deny(denials) => denials.iter().all(Denial::is_quiet_hours),
        }
    }

    pub fn has(&self, code: &str) -> bool {
        self.denials().iter().any(|d| d.code() == code)
    }
}

/// The single admission policy used by both the immediate-send path and the
/// queue drain.
///
/// The two paths differ only in which checks a critical notification may
/// bypass:
/// - `immediate_bypass` (default [`CriticalBypass::FULL`]): a critical send
///   ignores quota, throttle and quiet hours.
/// - `drain_bypass` (default [`CriticalBypass::NONE`]): the queue applies
///   quota and throttle uniformly to every level.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    pub timezone: Tz,
    pub immediate_bypass: CriticalBypass,
    pub drain_bypass: CriticalBypass,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl AdmissionPolicy {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            immediate_bypass: CriticalBypass::FULL,
            drain_bypass: CriticalBypass::NONE,
        }
    }

    pub fn bypass_for(&self, path: AdmissionPath) -> CriticalBypass {
        match path {
            AdmissionPath::Immediate => self.immediate_bypass,
            AdmissionPath::QueueDrain => self.drain_bypass,
        }
    }

    pub fn quiet_hours(&self) -> QuietHoursCalculator {
        QuietHoursCalculator::new(self.timezone)
    }

    /// Local calendar day of `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Bring the quota up to the current day.
    pub fn refresh(&self, state: &mut AdmissionState, now: DateTime<Utc>) {
        if state.quota.roll_over(self.today(now)) {
            debug!(date = %state.quota.date, "daily notification quota reset");
        }
    }

    /// Quota and throttle checks.
    ///
    /// Takes the state mutably only to roll the quota over to a new day.
    pub fn can_send(
        &self,
        priority: &Priority,
        state: &mut AdmissionState,
        now: DateTime<Utc>,
        path: AdmissionPath,
    ) -> Admission {
        self.refresh(state, now);
        let bypass = if priority.is_critical() {
            self.bypass_for(path)
        } else {
            CriticalBypass::NONE
        };

        let mut denials = Vec::new();
        if !bypass.quota && state.quota.is_exhausted() {
            denials.push(Denial::QuotaExceeded {
                sent: state.quota.sent_count,
                limit: state.quota.limit,
            });
        }
        if !bypass.throttle {
            if let Some(wait) = state.throttle.remaining(now) {
                denials.push(Denial::Throttled {
                    retry_in_secs: ceil_secs(wait),
                });
            }
        }
        Admission::from_denials(denials)
    }

    /// Immediate-send decision: quota and throttle first, then quiet hours
    /// when `respect_quiet_hours` is set.
    pub fn should_send(
        &self,
        priority: &Priority,
        state: &mut AdmissionState,
        now: DateTime<Utc>,
        respect_quiet_hours: bool,
    ) -> Admission {
        let mut denials = match self.can_send(priority, state, now, AdmissionPath::Immediate) {
            Admission::Allow => Vec::new(),
            Admission::Deny(denials) => denials,
        };

        let bypass_quiet = priority.is_critical() && self.immediate_bypass.quiet_hours;
        if respect_quiet_hours && !bypass_quiet {
            let calc = self.quiet_hours();
            if let Some(left) = calc.time_until_end(&state.quiet_hours, now) {
                denials.push(Denial::QuietHours {
                    remaining_secs: left.num_seconds(),
                });
            }
        }
        Admission::from_denials(denials)
    }

    /// Count a send against quota and throttle.
    pub fn record_send(&self, state: &mut AdmissionState, now: DateTime<Utc>) {
        self.refresh(state, now);
        state.quota.record();
        state.throttle.record(now);
    }
}

fn ceil_secs(d: Duration) -> i64 {
    let ms = d.num_milliseconds();
    (ms + 999).div_euclid(1000)
}
