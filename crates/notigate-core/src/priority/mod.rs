//! Notification priority model.
//!
//! A [`Priority`] is an ordered [`PriorityLevel`] plus a continuous weighted
//! score in `[0, 1]` used to order items inside the same level, and an
//! optional expiry after which the notification is no longer worth sending.

mod calculator;
mod level;

pub use calculator::{ContactFrequency, FactorScore, PriorityCalculator, PriorityFactor};
pub use level::{ParseLevelError, PriorityLevel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Urgency of a single notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub level: PriorityLevel,
    /// Fine-grained ordering within `level`, clamped to `[0, 1]`.
    pub weighted_score: f64,
    /// Factors that produced the score, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<FactorScore>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Priority {
    /// Create a priority with an explicit score. Out-of-range and NaN scores
    /// are clamped.
    pub fn new(level: PriorityLevel, weighted_score: f64) -> Self {
        Self {
            level,
            weighted_score: clamp_score(weighted_score),
            factors: Vec::new(),
            expires_at: None,
        }
    }

    /// Priority with the level's nominal score.
    pub fn of_level(level: PriorityLevel) -> Self {
        Self::new(level, level.base_score())
    }

    /// Build a priority whose score is the sum of factor contributions.
    pub fn from_factors(level: PriorityLevel, factors: Vec<FactorScore>) -> Self {
        let total: f64 = factors.iter().map(FactorScore::contribution).sum();
        Self {
            level,
            weighted_score: clamp_score(total),
            factors,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.level.is_critical()
    }

    /// True iff an expiry is set and lies strictly before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }

    /// Urgency ordering: `Less` means `self` is served first.
    ///
    /// Level descending, then weighted score descending.
    pub fn cmp_urgency(&self, other: &Self) -> Ordering {
        other
            .level
            .cmp(&self.level)
            .then_with(|| other.weighted_score.total_cmp(&self.weighted_score))
    }
}

/// Full queue ordering: urgency, then earlier `scheduled` first.
pub fn compare(
    a: &Priority,
    a_scheduled: DateTime<Utc>,
    b: &Priority,
    b_scheduled: DateTime<Utc>,
) -> Ordering {
    a.cmp_urgency(b).then_with(|| a_scheduled.cmp(&b_scheduled))
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
