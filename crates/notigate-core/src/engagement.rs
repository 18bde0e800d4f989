//! Engagement summary supplied by an external analytics collaborator.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// Most-active hours of the day (local time, `0..24`), sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSummary {
    most_active_hours: Vec<u8>,
}

impl EngagementSummary {
    /// Out-of-range hours are dropped.
    pub fn new(hours: impl IntoIterator<Item = u8>) -> Self {
        let mut most_active_hours: Vec<u8> = hours.into_iter().filter(|h| *h < 24).collect();
        most_active_hours.sort_unstable();
        most_active_hours.dedup();
        Self { most_active_hours }
    }

    pub fn most_active_hours(&self) -> &[u8] {
        &self.most_active_hours
    }

    pub fn is_empty(&self) -> bool {
        self.most_active_hours.is_empty()
    }
}

/// Read-only source of the current engagement snapshot.
pub trait EngagementSource: Send + Sync {
    fn summary(&self) -> EngagementSummary;
}

/// Engagement source holding a snapshot that an analytics process refreshes.
#[derive(Debug, Default)]
pub struct StaticEngagement {
    summary: RwLock<EngagementSummary>,
}

impl StaticEngagement {
    pub fn new(summary: EngagementSummary) -> Self {
        Self {
            summary: RwLock::new(summary),
        }
    }

    pub fn update(&self, summary: EngagementSummary) {
        *self.summary.write().unwrap_or_else(PoisonError::into_inner) = summary;
    }
}

impl EngagementSource for StaticEngagement {
    fn summary(&self) -> EngagementSummary {
        self.summary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
