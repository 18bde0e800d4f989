//! Bounded record of recent hand-offs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::channel::Dispatch;
use crate::priority::PriorityLevel;
use crate::queue::NotificationId;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    /// Handed off for later delivery (quiet hours, best time)
    Deferred,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: NotificationId,
    pub category: String,
    pub level: PriorityLevel,
    pub dispatched_at: DateTime<Utc>,
    pub deliver_at: DateTime<Utc>,
    pub outcome: DeliveryOutcome,
}

impl HistoryEntry {
    pub fn new(dispatch: &Dispatch, dispatched_at: DateTime<Utc>, outcome: DeliveryOutcome) -> Self {
        Self {
            id: dispatch.id,
            category: dispatch.category.clone(),
            level: dispatch.level,
            dispatched_at,
            deliver_at: dispatch.deliver_at,
            outcome,
        }
    }
}

/// Most recent entries last. Oldest entries are dropped past `limit`.
#[derive(Debug, Clone)]
pub struct SendHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl Default for SendHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl SendHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            limit,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, DeliveryOutcome::Failed { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(n: u32, outcome: DeliveryOutcome) -> HistoryEntry {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, n, 0).unwrap();
        HistoryEntry {
            id: NotificationId::new(),
            category: format!("C{n}"),
            level: PriorityLevel::Normal,
            dispatched_at: at,
            deliver_at: at,
            outcome,
        }
    }

    #[test]
    fn drops_oldest_past_limit() {
        let mut history = SendHistory::with_limit(3);
        for n in 0..5 {
            history.push(entry(n, DeliveryOutcome::Delivered));
        }
        let cats: Vec<_> = history.entries().into_iter().map(|e| e.category).collect();
        assert_eq!(cats, vec!["C2", "C3", "C4"]);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut history = SendHistory::with_limit(0);
        history.push(entry(1, DeliveryOutcome::Delivered));
        assert!(history.is_empty());
    }

    #[test]
    fn counts_failures() {
        let mut history = SendHistory::default();
        history.push(entry(1, DeliveryOutcome::Delivered));
        history.push(entry(
            2,
            DeliveryOutcome::Failed {
                reason: "offline".into(),
            },
        ));
        assert_eq!(history.failures(), 1);
        assert_eq!(history.len(), 2);
    }
}
