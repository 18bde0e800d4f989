//! Engine front door.
//!
//! The [`Orchestrator`] owns the queue, the admission state and the send
//! history behind a single async mutex, so producers calling in from
//! different tasks never interleave a read-modify-write on the counters.
//! A background task started with [`Orchestrator::spawn`] sweeps expired
//! items and drains the queue on a fixed interval.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::admission::{Admission, AdmissionPath, AdmissionPolicy, AdmissionState};
use crate::best_time::BestTimeScheduler;
use crate::channel::{DeliveryChannel, Dispatch};
use crate::clock::{Clock, SystemClock};
use crate::engagement::{EngagementSource, StaticEngagement};
use crate::error::DeliveryError;
use crate::history::{DeliveryOutcome, HistoryEntry, SendHistory};
use crate::priority::{Priority, PriorityLevel};
use crate::queue::{NotificationId, PriorityAdmissionQueue, QueueItem, QueueSnapshot};
use crate::quiet_hours::QuietHoursConfig;
use crate::storage::{EngineConfig, StateStore};

/// Result of handing one notification to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Dispatched for immediate delivery.
    Sent { id: NotificationId },
    /// Dispatched for delivery at a later instant.
    Deferred {
        id: NotificationId,
        deliver_at: DateTime<Utc>,
        reason: Option<String>,
    },
    /// Held in the admission queue for a later drain.
    Queued { id: NotificationId, reason: String },
    /// The channel rejected the hand-off.
    Failed {
        id: NotificationId,
        error: String,
        requeued: bool,
    },
    /// Already past its expiry; discarded.
    Expired { id: NotificationId },
}

impl SubmitOutcome {
    pub fn id(&self) -> NotificationId {
        match self {
            SubmitOutcome::Sent { id }
            | SubmitOutcome::Deferred { id, .. }
            | SubmitOutcome::Queued { id, .. }
            | SubmitOutcome::Failed { id, .. }
            | SubmitOutcome::Expired { id } => *id,
        }
    }
}

/// Flat view of a [`SubmitOutcome`] for callers that only need to know
/// whether the notification went out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub id: NotificationId,
    pub sent: bool,
    pub deferred_until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl From<SubmitOutcome> for SendOutcome {
    fn from(outcome: SubmitOutcome) -> Self {
        let id = outcome.id();
        let (sent, deferred_until, reason) = match outcome {
            SubmitOutcome::Sent { .. } => (true, None, None),
            SubmitOutcome::Deferred {
                deliver_at, reason, ..
            } => (false, Some(deliver_at), reason),
            SubmitOutcome::Queued { reason, .. } => (false, None, Some(reason)),
            SubmitOutcome::Failed { error, .. } => (false, None, Some(error)),
            SubmitOutcome::Expired { .. } => (false, None, Some("expired".to_string())),
        };
        Self {
            id,
            sent,
            deferred_until,
            reason,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Another tick was still running; nothing was done.
    pub skipped: bool,
    pub expired: usize,
    pub dispatched: usize,
    pub failed: usize,
    pub requeued: usize,
    /// The drain was held because quiet hours are active.
    pub held_for_quiet_hours: bool,
    pub remaining: usize,
}

/// Admission and queue counters for dashboards and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatistics {
    pub total_in_queue: usize,
    pub sent_today: u32,
    pub remaining_quota: u32,
    pub limit: u32,
    pub by_level: BTreeMap<PriorityLevel, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub is_throttling: bool,
    pub quiet_hours_active: bool,
    /// `sent_today / limit`
    pub utilization_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    quiet_hours_margin: Duration,
    drain_respects_quiet_hours: bool,
    requeue_on_delivery_failure: bool,
}

struct Engine {
    queue: PriorityAdmissionQueue,
    state: AdmissionState,
    policy: AdmissionPolicy,
    history: SendHistory,
}

impl Engine {
    fn quiet_hours_end(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.policy
            .quiet_hours()
            .end_instant(&self.state.quiet_hours, at)
    }
}

/// Clears the tick flag when a tick finishes, including on panic.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serializes every engine operation and drives the periodic sweep.
pub struct Orchestrator {
    engine: Mutex<Engine>,
    settings: Settings,
    channel: Arc<dyn DeliveryChannel>,
    store: Arc<dyn StateStore>,
    engagement: Arc<dyn EngagementSource>,
    clock: Arc<dyn Clock>,
    ticking: AtomicBool,
    tick_interval: std::time::Duration,
}

impl Orchestrator {
    /// Engine on the system clock with no engagement data.
    pub fn new(
        config: &EngineConfig,
        channel: Arc<dyn DeliveryChannel>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self::with_collaborators(
            config,
            channel,
            store,
            Arc::new(StaticEngagement::default()),
            Arc::new(SystemClock),
        )
    }

    /// Build the engine, restoring admission state from `store`.
    ///
    /// Stored limit, interval and quiet hours take precedence over `config`;
    /// the configuration only seeds a store that is empty or unreadable.
    pub fn with_collaborators(
        config: &EngineConfig,
        channel: Arc<dyn DeliveryChannel>,
        store: Arc<dyn StateStore>,
        engagement: Arc<dyn EngagementSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = config.sanitized();
        let policy = config.policy();
        let now = clock.now();

        let seeded = || {
            AdmissionState::new(
                policy.today(now),
                config.daily_limit,
                config.min_interval_secs,
            )
            .with_quiet_hours(config.quiet_hours)
        };
        let mut state = match store.load() {
            Ok(Some(mut state)) => {
                state.sanitize();
                state
            }
            Ok(None) => seeded(),
            Err(e) => {
                warn!(error = %e, "could not load admission state, starting fresh");
                seeded()
            }
        };
        policy.refresh(&mut state, now);

        info!(
            channel = channel.name(),
            timezone = %policy.timezone,
            daily_limit = state.quota.limit,
            min_interval_secs = state.throttle.min_interval_secs,
            quiet_hours = state.quiet_hours.enabled,
            "notification engine ready"
        );

        Self {
            engine: Mutex::new(Engine {
                queue: PriorityAdmissionQueue::new(),
                state,
                policy,
                history: SendHistory::with_limit(config.history_limit),
            }),
            settings: Settings {
                quiet_hours_margin: Duration::seconds(config.quiet_hours_margin_secs as i64),
                drain_respects_quiet_hours: config.drain_respects_quiet_hours,
                requeue_on_delivery_failure: config.requeue_on_delivery_failure,
            },
            channel,
            store,
            engagement,
            clock,
            ticking: AtomicBool::new(false),
            tick_interval: std::time::Duration::from_secs(config.tick_interval_secs),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn persist(&self, state: &AdmissionState) {
        if let Err(e) = self.store.save(state) {
            warn!(error = %e, "failed to persist admission state");
        }
    }

    /// Hand `item` to the channel and record the attempt in history.
    fn hand_off(
        &self,
        engine: &mut Engine,
        item: &QueueItem,
        deliver_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DeliveryError> {
        let dispatch = Dispatch::from_item(item, deliver_at);
        let result = self.channel.dispatch(&dispatch);
        let outcome = match &result {
            Ok(()) if deliver_at > now => DeliveryOutcome::Deferred,
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!(
                    id = %item.id,
                    category = %item.category,
                    channel = self.channel.name(),
                    error = %e,
                    "notification hand-off failed"
                );
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        engine.history.push(HistoryEntry::new(&dispatch, now, outcome));
        result
    }

    /// Dispatch an admitted item, count it, and map failures.
    fn deliver(
        &self,
        engine: &mut Engine,
        item: QueueItem,
        deliver_at: DateTime<Utc>,
        now: DateTime<Utc>,
        reason: Option<String>,
    ) -> SubmitOutcome {
        let id = item.id;
        match self.hand_off(engine, &item, deliver_at, now) {
            Ok(()) => {
                let policy = engine.policy;
                policy.record_send(&mut engine.state, now);
                self.persist(&engine.state);
                if deliver_at > now {
                    SubmitOutcome::Deferred {
                        id,
                        deliver_at,
                        reason,
                    }
                } else {
                    SubmitOutcome::Sent { id }
                }
            }
            Err(e) => {
                let requeued = self.settings.requeue_on_delivery_failure;
                if requeued {
                    engine.queue.enqueue(item);
                }
                SubmitOutcome::Failed {
                    id,
                    error: e.to_string(),
                    requeued,
                }
            }
        }
    }

    /// Queue a notification for the next drain.
    pub async fn enqueue(
        &self,
        category: impl Into<String>,
        priority: Priority,
        payload: serde_json::Value,
        scheduled_time: Option<DateTime<Utc>>,
    ) -> NotificationId {
        let scheduled_time = scheduled_time.unwrap_or_else(|| self.clock.now());
        let item = QueueItem::new(category, priority, payload, scheduled_time);
        self.engine.lock().await.queue.enqueue(item)
    }

    /// Remove one queued item. Does not touch quota or throttle.
    pub async fn cancel(&self, id: NotificationId) -> bool {
        let removed = self.engine.lock().await.queue.cancel(id).is_some();
        if removed {
            debug!(%id, "queued notification cancelled");
        }
        removed
    }

    pub async fn cancel_category(&self, category: &str) -> usize {
        let removed = self.engine.lock().await.queue.cancel_category(category);
        debug!(category, removed, "queued category cancelled");
        removed
    }

    pub async fn clear_queue(&self) {
        self.engine.lock().await.queue.clear();
    }

    pub async fn reprioritize_category(&self, category: &str, priority: Priority) -> usize {
        self.engine
            .lock()
            .await
            .queue
            .reprioritize_category(category, &priority)
    }

    /// Immediate-send path for a prepared item.
    ///
    /// - allowed: dispatched now and counted.
    /// - denied by quiet hours alone: dispatched for delivery when quiet
    ///   hours end plus the configured margin, and counted. Throttle spacing
    ///   applies at hand-off, so every deferral from one window shares that
    ///   delivery instant.
    /// - denied by quota or throttle: left in the queue.
    pub async fn submit(&self, item: QueueItem) -> SubmitOutcome {
        let now = self.clock.now();
        let mut engine = self.engine.lock().await;

        if item.is_expired(now) {
            debug!(id = %item.id, "discarding expired notification on submit");
            return SubmitOutcome::Expired { id: item.id };
        }

        let policy = engine.policy;
        let decision = policy.should_send(&item.priority, &mut engine.state, now, true);
        match decision {
            Admission::Allow => self.deliver(&mut engine, item, now, now, None),
            ref denied if denied.only_quiet_hours() => {
                let reason = denied.reason();
                let deliver_at = engine
                    .quiet_hours_end(now)
                    .map_or(now, |end| end + self.settings.quiet_hours_margin);
                debug!(id = %item.id, %deliver_at, "deferring notification past quiet hours");
                self.deliver(&mut engine, item, deliver_at, now, reason)
            }
            denied => {
                let reason = denied.reason().unwrap_or_default();
                debug!(id = %item.id, %reason, "notification held in queue");
                let id = engine.queue.enqueue(item);
                SubmitOutcome::Queued { id, reason }
            }
        }
    }

    pub async fn submit_new(
        &self,
        category: impl Into<String>,
        priority: Priority,
        payload: serde_json::Value,
    ) -> SubmitOutcome {
        let item = QueueItem::new(category, priority, payload, self.clock.now());
        self.submit(item).await
    }

    /// Try to deliver right away; see [`Orchestrator::submit`].
    pub async fn try_send_now(
        &self,
        category: impl Into<String>,
        priority: Priority,
        payload: serde_json::Value,
    ) -> SendOutcome {
        self.submit_new(category, priority, payload).await.into()
    }

    /// Dispatch for the next best hour given current engagement.
    ///
    /// A non-critical target inside quiet hours moves to the end of quiet
    /// hours plus the margin. If quota or throttle deny the hand-off now, the
    /// item is queued with the computed target as its scheduled time.
    pub async fn schedule_at_best_time(
        &self,
        category: impl Into<String>,
        priority: Priority,
        payload: serde_json::Value,
    ) -> SubmitOutcome {
        let category = category.into();
        let now = self.clock.now();
        let summary = self.engagement.summary();
        let mut engine = self.engine.lock().await;
        let policy = engine.policy;

        let mut target = BestTimeScheduler::new(policy.timezone).best_time(
            &category,
            summary.most_active_hours(),
            now,
        );
        if !priority.is_critical() {
            if let Some(end) = engine.quiet_hours_end(target) {
                target = end + self.settings.quiet_hours_margin;
            }
        }

        let item = QueueItem::new(category, priority, payload, target);
        if item.is_expired(now) {
            return SubmitOutcome::Expired { id: item.id };
        }
        let decision =
            policy.can_send(&item.priority, &mut engine.state, now, AdmissionPath::Immediate);
        if let Some(reason) = decision.reason() {
            debug!(id = %item.id, %reason, %target, "best-time notification held in queue");
            let id = engine.queue.enqueue(item);
            return SubmitOutcome::Queued { id, reason };
        }
        self.deliver(&mut engine, item, target, now, None)
    }

    /// Immediate-send decision without sending.
    pub async fn should_send(&self, priority: &Priority, respect_quiet_hours: bool) -> Admission {
        let now = self.clock.now();
        let mut engine = self.engine.lock().await;
        let policy = engine.policy;
        policy.should_send(priority, &mut engine.state, now, respect_quiet_hours)
    }

    /// Set the daily quota, clamped to 1..=50. Returns the applied value.
    pub async fn set_daily_limit(&self, limit: i64) -> u32 {
        let mut engine = self.engine.lock().await;
        let applied = engine.state.quota.set_limit(limit);
        self.persist(&engine.state);
        info!(requested = limit, applied, "daily notification limit updated");
        applied
    }

    /// Set the throttle spacing, capped at one day. Returns the applied value.
    pub async fn set_min_interval(&self, secs: u64) -> u64 {
        let mut engine = self.engine.lock().await;
        let applied = engine.state.throttle.set_min_interval(secs);
        self.persist(&engine.state);
        info!(requested = secs, applied, "minimum notification interval updated");
        applied
    }

    pub async fn set_quiet_hours(&self, quiet_hours: QuietHoursConfig) {
        let mut engine = self.engine.lock().await;
        engine.state.quiet_hours = quiet_hours;
        self.persist(&engine.state);
        info!(
            enabled = quiet_hours.enabled,
            start = %quiet_hours.start,
            end = %quiet_hours.end,
            "quiet hours updated"
        );
    }

    /// Time left in the current quiet-hours window, if one is active.
    pub async fn quiet_hours_remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        let engine = self.engine.lock().await;
        engine.quiet_hours_end(now).map(|end| end - now)
    }

    /// Copy of the admission state, rolled over to today.
    pub async fn state(&self) -> AdmissionState {
        let now = self.clock.now();
        let mut engine = self.engine.lock().await;
        let policy = engine.policy;
        policy.refresh(&mut engine.state, now);
        engine.state.clone()
    }

    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        self.engine.lock().await.queue.snapshot()
    }

    pub async fn queued(&self) -> Vec<QueueItem> {
        self.engine.lock().await.queue.iter().cloned().collect()
    }

    pub async fn statistics(&self) -> QueueStatistics {
        let now = self.clock.now();
        let mut engine = self.engine.lock().await;
        let policy = engine.policy;
        policy.refresh(&mut engine.state, now);

        let snapshot = engine.queue.snapshot();
        let quota = &engine.state.quota;
        QueueStatistics {
            total_in_queue: snapshot.size,
            sent_today: quota.sent_count,
            remaining_quota: quota.remaining(),
            limit: quota.limit,
            by_level: snapshot.by_level,
            by_category: snapshot.by_category,
            is_throttling: engine.state.throttle.is_active(now),
            quiet_hours_active: policy
                .quiet_hours()
                .is_active(&engine.state.quiet_hours, now),
            utilization_rate: f64::from(quota.sent_count) / f64::from(quota.limit.max(1)),
        }
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.engine.lock().await.history.entries()
    }

    pub async fn remove_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.engine.lock().await.queue.remove_expired(now);
        if removed > 0 {
            debug!(removed, "expired notifications removed");
        }
        removed
    }

    /// One sweep: drop expired items, then drain the queue until the policy
    /// says stop.
    ///
    /// A tick that starts while another is still running returns at once
    /// with `skipped` set.
    pub async fn tick(&self) -> TickReport {
        if self.ticking.swap(true, Ordering::AcqRel) {
            debug!("previous tick still running, skipping");
            return TickReport {
                skipped: true,
                ..TickReport::default()
            };
        }
        let _guard = TickGuard(&self.ticking);

        let now = self.clock.now();
        let mut guard = self.engine.lock().await;
        let engine = &mut *guard;
        let policy = engine.policy;
        let mut report = TickReport {
            expired: engine.queue.remove_expired(now),
            ..TickReport::default()
        };

        let quiet = policy
            .quiet_hours()
            .is_active(&engine.state.quiet_hours, now);
        if quiet && self.settings.drain_respects_quiet_hours {
            report.held_for_quiet_hours = true;
        } else {
            let mut retry = Vec::new();
            loop {
                let checkpoint = engine.state.clone();
                let Some(item) = engine.queue.dequeue(&policy, &mut engine.state, now) else {
                    break;
                };
                let deliver_at = item.scheduled_time.max(now);
                match self.hand_off(engine, &item, deliver_at, now) {
                    Ok(()) => report.dispatched += 1,
                    Err(_) => {
                        // only successful hand-offs count against the limits
                        engine.state = checkpoint;
                        report.failed += 1;
                        if self.settings.requeue_on_delivery_failure {
                            retry.push(item);
                        }
                    }
                }
            }
            report.requeued = retry.len();
            for item in retry {
                engine.queue.enqueue(item);
            }
        }

        if report.dispatched > 0 {
            self.persist(&engine.state);
        }
        report.remaining = engine.queue.len();
        debug!(
            expired = report.expired,
            dispatched = report.dispatched,
            failed = report.failed,
            remaining = report.remaining,
            held = report.held_for_quiet_hours,
            "tick finished"
        );
        report
    }

    /// Run [`Orchestrator::tick`] on the configured interval until `cancel`
    /// fires. The first tick runs immediately.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = self.tick_interval.as_secs(),
            "notification ticker started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick().await;
                    if report.dispatched > 0 || report.expired > 0 {
                        info!(
                            dispatched = report.dispatched,
                            expired = report.expired,
                            remaining = report.remaining,
                            "queue drained"
                        );
                    }
                }
                _ = cancel.cancelled() => {
                    info!("notification ticker shutting down");
                    break;
                }
            }
        }
    }

    /// Start [`Orchestrator::run`] on the tokio runtime.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(cancel))
    }
}
