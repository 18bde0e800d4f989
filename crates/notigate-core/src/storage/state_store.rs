//! Durable admission counters.
//!
//! Only [`AdmissionState`] is persisted. The queue lives in memory.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::data_dir;
use crate::admission::AdmissionState;
use crate::error::{ConfigError, StoreError};

/// Key-value persistence for the admission state.
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<AdmissionState>, StoreError>;

    fn save(&self, state: &AdmissionState) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<AdmissionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AdmissionState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AdmissionState>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &AdmissionState) -> Result<(), StoreError> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }
}

/// Pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/state.json`
    pub fn in_data_dir() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join("state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<AdmissionState>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::ReadFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let mut state: AdmissionState =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        state.sanitize();
        Ok(Some(state))
    }

    fn save(&self, state: &AdmissionState) -> Result<(), StoreError> {
        let write_failed = |source| StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(state).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        std::fs::write(&self.path, json).map_err(write_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiet_hours::QuietHoursConfig;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample() -> AdmissionState {
        let mut state = AdmissionState::new(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(), 7, 120)
            .with_quiet_hours(QuietHoursConfig::from_minutes(22 * 60, 8 * 60));
        state.throttle.last_sent_at = Some(Utc.with_ymd_and_hms(2025, 8, 1, 9, 30, 0).unwrap());
        state.quota.sent_count = 3;
        state
    }

    #[test]
    fn memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(sample()));
    }

    #[test]
    fn json_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn json_store_clamps_hand_edited_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"quota":{"date":"2025-08-01","sent_count":0,"limit":900}}"#,
        )
        .unwrap();
        let state = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(state.quota.limit, 50);
        assert_eq!(state.throttle.min_interval_secs, 300);
        assert!(!state.quiet_hours.enabled);
    }
}
