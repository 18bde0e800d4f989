//! Delivery channel abstraction.
//!
//! The engine hands admitted notifications to a [`DeliveryChannel`] and
//! does not wait for confirmation. A send is counted at hand-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::info;

use crate::error::DeliveryError;
use crate::priority::PriorityLevel;
use crate::queue::{NotificationId, QueueItem};

/// What a channel receives for one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: NotificationId,
    pub category: String,
    pub level: PriorityLevel,
    pub payload: serde_json::Value,
    /// When the notification should be shown. Equal to the hand-off time for
    /// immediate sends.
    pub deliver_at: DateTime<Utc>,
}

impl Dispatch {
    pub fn from_item(item: &QueueItem, deliver_at: DateTime<Utc>) -> Self {
        Self {
            id: item.id,
            category: item.category.clone(),
            level: item.priority.level,
            payload: item.payload.clone(),
            deliver_at,
        }
    }
}

/// Anything that can show a notification.
///
/// Implementations must return promptly; the engine calls `dispatch` while
/// holding its state lock.
pub trait DeliveryChannel: Send + Sync {
    /// Channel identifier used in logs and errors.
    fn name(&self) -> &str;

    fn dispatch(&self, dispatch: &Dispatch) -> Result<(), DeliveryError>;
}

/// Channel that only logs.
#[derive(Debug, Default)]
pub struct LogChannel;

impl DeliveryChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn dispatch(&self, dispatch: &Dispatch) -> Result<(), DeliveryError> {
        info!(
            id = %dispatch.id,
            category = %dispatch.category,
            level = %dispatch.level,
            deliver_at = %dispatch.deliver_at,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Channel that keeps every dispatch in memory. Can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Dispatch>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Dispatch> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl DeliveryChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn dispatch(&self, dispatch: &Dispatch) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Rejected {
                channel: self.name().to_string(),
                message: "channel switched off".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dispatch.clone());
        Ok(())
    }
}
