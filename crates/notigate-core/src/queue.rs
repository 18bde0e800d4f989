//! Priority-ordered admission queue.
//!
//! Items are kept sorted by [`crate::priority::compare`]. Draining goes
//! through the shared [`AdmissionPolicy`] on the [`AdmissionPath::QueueDrain`]
//! path, so quota and throttle apply to every item alike unless the drain
//! bypass is configured otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::admission::{AdmissionPath, AdmissionPolicy, AdmissionState};
use crate::priority::{self, Priority, PriorityLevel};

/// Notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A candidate notification waiting for admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: NotificationId,
    /// Category tag, e.g. `CONTACT_REMINDER`
    pub category: String,
    pub priority: Priority,
    pub scheduled_time: DateTime<Utc>,
    /// Opaque content, never inspected by the engine
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl QueueItem {
    pub fn new(
        category: impl Into<String>,
        priority: Priority,
        payload: serde_json::Value,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            category: category.into(),
            priority,
            scheduled_time,
            payload,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.priority.is_expired(now)
    }

    fn queue_order(&self, other: &Self) -> std::cmp::Ordering {
        priority::compare(
            &self.priority,
            self.scheduled_time,
            &other.priority,
            other.scheduled_time,
        )
    }
}

/// Read-only view of what is waiting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub size: usize,
    pub by_level: BTreeMap<PriorityLevel, usize>,
    pub by_category: BTreeMap<String, usize>,
}

/// Sorted queue of pending notifications. Front is served first.
#[derive(Debug, Clone, Default)]
pub struct PriorityAdmissionQueue {
    items: Vec<QueueItem>,
}

impl PriorityAdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn peek(&self) -> Option<&QueueItem> {
        self.items.first()
    }

    /// Insert in sorted position. Items comparing equal keep insertion order.
    pub fn enqueue(&mut self, item: QueueItem) -> NotificationId {
        let id = item.id;
        let at = self
            .items
            .partition_point(|existing| existing.queue_order(&item).is_le());
        debug!(
            %id,
            category = %item.category,
            level = %item.priority.level,
            position = at,
            "notification queued"
        );
        self.items.insert(at, item);
        id
    }

    /// Take the next admissible item.
    ///
    /// Returns `None` without removing anything when the queue is empty or
    /// the policy denies the front item. Expired items at the front are
    /// discarded and the next one is tried. A returned item has already been
    /// counted against quota and throttle.
    pub fn dequeue(
        &mut self,
        policy: &AdmissionPolicy,
        state: &mut AdmissionState,
        now: DateTime<Utc>,
    ) -> Option<QueueItem> {
        loop {
            let front = self.items.first()?;
            let decision = policy.can_send(&front.priority, state, now, AdmissionPath::QueueDrain);
            if !decision.can_send() {
                debug!(
                    id = %front.id,
                    reason = decision.reason().unwrap_or_default(),
                    "queue drain held"
                );
                return None;
            }

            let item = self.items.remove(0);
            if item.is_expired(now) {
                debug!(id = %item.id, category = %item.category, "discarding expired notification");
                continue;
            }
            policy.record_send(state, now);
            return Some(item);
        }
    }

    /// Drop every expired item. Returns how many were removed.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.is_expired(now));
        before - self.items.len()
    }

    pub fn cancel(&mut self, id: NotificationId) -> Option<QueueItem> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Remove every item of `category`. Returns how many were removed.
    pub fn cancel_category(&mut self, category: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.category != category);
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Give every item of `category` a new priority and restore ordering.
    pub fn reprioritize_category(&mut self, category: &str, priority: &Priority) -> usize {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|item| item.category == category) {
            item.priority = priority.clone();
            changed += 1;
        }
        if changed > 0 {
            // stable, so equal items keep their relative order
            self.items.sort_by(QueueItem::queue_order);
        }
        changed
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut snapshot = QueueSnapshot {
            size: self.items.len(),
            ..QueueSnapshot::default()
        };
        for item in &self.items {
            *snapshot.by_level.entry(item.priority.level).or_default() += 1;
            *snapshot.by_category.entry(item.category.clone()).or_default() += 1;
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn item(category: &str, level: PriorityLevel, score: f64) -> QueueItem {
        QueueItem::new(category, Priority::new(level, score), json!({}), t0())
    }

    fn open_state(limit: u32, interval: u64) -> AdmissionState {
        AdmissionState::new(AdmissionPolicy::default().today(t0()), limit, interval)
    }

    #[test]
    fn higher_level_is_served_first() {
        let policy = AdmissionPolicy::default();
        let mut state = open_state(50, 0);
        let mut queue = PriorityAdmissionQueue::new();
        queue.enqueue(item("SUGGESTION", PriorityLevel::Low, 0.9));
        queue.enqueue(item("GOAL_REMINDER", PriorityLevel::High, 0.1));
        queue.enqueue(item("HABIT_REMINDER", PriorityLevel::Normal, 0.5));

        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue(&policy, &mut state, t0()))
            .map(|i| i.priority.level)
            .collect();
        assert_eq!(
            order,
            vec![PriorityLevel::High, PriorityLevel::Normal, PriorityLevel::Low]
        );
    }

    #[test]
    fn equal_priority_is_fifo_by_schedule_then_insertion() {
        let mut queue = PriorityAdmissionQueue::new();
        let mut late = item("A", PriorityLevel::Normal, 0.5);
        late.scheduled_time = t0() + Duration::minutes(5);
        let early = item("B", PriorityLevel::Normal, 0.5);
        let early_twin = item("C", PriorityLevel::Normal, 0.5);

        queue.enqueue(late);
        queue.enqueue(early);
        queue.enqueue(early_twin);

        let cats: Vec<_> = queue.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(cats, vec!["B", "C", "A"]);
    }

    #[test]
    fn quota_of_two_holds_third_until_next_day() {
        let policy = AdmissionPolicy::default();
        let mut state = open_state(2, 0);
        let mut queue = PriorityAdmissionQueue::new();
        for _ in 0..3 {
            queue.enqueue(item("GOAL_REMINDER", PriorityLevel::Normal, 0.5));
        }

        assert!(queue.dequeue(&policy, &mut state, t0()).is_some());
        assert!(queue.dequeue(&policy, &mut state, t0()).is_some());
        assert!(queue.dequeue(&policy, &mut state, t0()).is_none());
        assert_eq!(queue.len(), 1);

        let tomorrow = t0() + Duration::days(1);
        assert!(queue.dequeue(&policy, &mut state, tomorrow).is_some());
        assert_eq!(state.quota.sent_count, 1);
    }

    #[test]
    fn critical_items_do_not_skip_drain_limits() {
        let policy = AdmissionPolicy::default();
        let mut state = open_state(1, 0);
        let mut queue = PriorityAdmissionQueue::new();
        queue.enqueue(item("STREAK_WARNING", PriorityLevel::Critical, 1.0));
        queue.enqueue(item("STREAK_WARNING", PriorityLevel::Critical, 1.0));

        assert!(queue.dequeue(&policy, &mut state, t0()).is_some());
        assert!(queue.dequeue(&policy, &mut state, t0()).is_none());
    }

    #[test]
    fn throttle_holds_queue_without_removing() {
        let policy = AdmissionPolicy::default();
        let mut state = open_state(20, 300);
        let mut queue = PriorityAdmissionQueue::new();
        queue.enqueue(item("A", PriorityLevel::Normal, 0.5));
        queue.enqueue(item("B", PriorityLevel::Normal, 0.4));

        assert!(queue.dequeue(&policy, &mut state, t0()).is_some());
        assert!(queue
            .dequeue(&policy, &mut state, t0() + Duration::seconds(100))
            .is_none());
        assert_eq!(queue.len(), 1);
        let next = queue
            .dequeue(&policy, &mut state, t0() + Duration::seconds(301))
            .unwrap();
        assert_eq!(next.category, "B");
    }

    #[test]
    fn expired_items_are_never_dequeued() {
        let policy = AdmissionPolicy::default();
        let mut state = open_state(20, 0);
        let mut queue = PriorityAdmissionQueue::new();
        let mut stale = item("STALE", PriorityLevel::High, 1.0);
        stale.priority = stale.priority.with_expiry(t0() - Duration::minutes(1));
        queue.enqueue(stale);
        queue.enqueue(item("FRESH", PriorityLevel::Low, 0.1));

        let got = queue.dequeue(&policy, &mut state, t0()).unwrap();
        assert_eq!(got.category, "FRESH");
        assert_eq!(state.quota.sent_count, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_expired_sweeps_everything_stale() {
        let mut queue = PriorityAdmissionQueue::new();
        for minutes in [-10, -1, 30] {
            let mut it = item("X", PriorityLevel::Normal, 0.5);
            it.priority = it.priority.with_expiry(t0() + Duration::minutes(minutes));
            queue.enqueue(it);
        }
        queue.enqueue(item("Y", PriorityLevel::Normal, 0.5));

        assert_eq!(queue.remove_expired(t0()), 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn cancel_leaves_counters_alone() {
        let mut state = open_state(20, 300);
        let mut queue = PriorityAdmissionQueue::new();
        let id = queue.enqueue(item("A", PriorityLevel::Normal, 0.5));
        queue.enqueue(item("B", PriorityLevel::Normal, 0.5));
        queue.enqueue(item("B", PriorityLevel::Low, 0.5));
        let before = state.clone();

        assert_eq!(queue.cancel(id).map(|i| i.category), Some("A".to_string()));
        assert!(queue.cancel(id).is_none());
        assert_eq!(queue.cancel_category("B"), 2);
        assert!(queue.is_empty());

        state.sanitize();
        assert_eq!(state, before);
    }

    #[test]
    fn reprioritize_moves_category_forward() {
        let mut queue = PriorityAdmissionQueue::new();
        queue.enqueue(item("A", PriorityLevel::High, 0.5));
        queue.enqueue(item("B", PriorityLevel::Low, 0.5));

        let n = queue.reprioritize_category("B", &Priority::of_level(PriorityLevel::Critical));
        assert_eq!(n, 1);
        assert_eq!(queue.peek().map(|i| i.category.as_str()), Some("B"));
    }

    #[test]
    fn snapshot_counts_by_level_and_category() {
        let mut queue = PriorityAdmissionQueue::new();
        queue.enqueue(item("A", PriorityLevel::High, 0.5));
        queue.enqueue(item("A", PriorityLevel::Low, 0.5));
        queue.enqueue(item("B", PriorityLevel::Low, 0.5));

        let snap = queue.snapshot();
        assert_eq!(snap.size, 3);
        assert_eq!(snap.by_level.get(&PriorityLevel::Low), Some(&2));
        assert_eq!(snap.by_level.get(&PriorityLevel::High), Some(&1));
        assert_eq!(snap.by_category.get("A"), Some(&2));

        queue.clear();
        assert_eq!(queue.snapshot(), QueueSnapshot::default());
    }

    #[test]
    fn id_parses_from_display() {
        let id = NotificationId::new();
        assert_eq!(id.to_string().parse::<NotificationId>().unwrap(), id);
    }

    fn any_level() -> impl Strategy<Value = PriorityLevel> {
        prop::sample::select(PriorityLevel::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn drain_order_is_sorted(entries in prop::collection::vec((any_level(), 0.0f64..=1.0, 0i64..600), 1..40)) {
            let policy = AdmissionPolicy::default();
            let mut state = open_state(50, 0);
            let mut queue = PriorityAdmissionQueue::new();
            for (level, score, offset) in entries {
                let mut it = item("P", level, score);
                it.scheduled_time = t0() + Duration::seconds(offset);
                queue.enqueue(it);
            }

            let drained: Vec<_> = std::iter::from_fn(|| queue.dequeue(&policy, &mut state, t0())).collect();
            for pair in drained.windows(2) {
                prop_assert!(pair[0].queue_order(&pair[1]).is_le());
                prop_assert!(pair[0].priority.level >= pair[1].priority.level);
            }
        }
    }
}
