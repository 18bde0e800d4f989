//! # notigate Core Library
//!
//! Admission control and delivery scheduling for client-side notifications.
//! Many unrelated producers (reminders, streak warnings, suggestions,
//! geofence events) hand candidate notifications to the engine, which
//! decides whether, when and in what order each one reaches the external
//! delivery channel.
//!
//! ## Architecture
//!
//! - **Priority model**: ordered level + weighted score + optional expiry
//! - **Admission**: one [`AdmissionPolicy`] evaluating daily quota, throttle
//!   spacing and quiet hours against an explicit [`AdmissionState`]
//! - **Queue**: [`PriorityAdmissionQueue`] holding pending items in priority
//!   order and draining them through the policy
//! - **Timing**: [`QuietHoursCalculator`] and [`BestTimeScheduler`]
//! - **Orchestrator**: [`Orchestrator`] serializes all mutations behind one
//!   lock and drives the periodic expiry sweep / queue drain
//!
//! The delivery channel, the durable key-value store and the engagement
//! summary are collaborators behind traits ([`DeliveryChannel`],
//! [`StateStore`], [`EngagementSource`]).

pub mod admission;
pub mod best_time;
pub mod channel;
pub mod clock;
pub mod engagement;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod priority;
pub mod queue;
pub mod quiet_hours;
pub mod storage;

pub use admission::{
    Admission, AdmissionPath, AdmissionPolicy, AdmissionState, CriticalBypass, Denial, QuotaState,
    ThrottleState,
};
pub use best_time::{BestTimeScheduler, NotificationCategory};
pub use channel::{DeliveryChannel, Dispatch, LogChannel, RecordingChannel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engagement::{EngagementSource, EngagementSummary, StaticEngagement};
pub use error::{ConfigError, CoreError, DeliveryError, StoreError};
pub use history::{DeliveryOutcome, HistoryEntry, SendHistory};
pub use orchestrator::{Orchestrator, QueueStatistics, SendOutcome, SubmitOutcome, TickReport};
pub use priority::{Priority, PriorityCalculator, PriorityFactor, PriorityLevel};
pub use queue::{NotificationId, PriorityAdmissionQueue, QueueItem, QueueSnapshot};
pub use quiet_hours::{QuietHoursCalculator, QuietHoursConfig};
pub use storage::{EngineConfig, JsonFileStore, MemoryStore, StateStore};
