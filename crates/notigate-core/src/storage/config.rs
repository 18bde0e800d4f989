//! TOML-based engine configuration.
//!
//! Stored at `<data dir>/config.toml`. Every numeric value is clamped when
//! it is used, so a bad file can narrow delivery but never block it
//! entirely.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::admission::{
    clamp_daily_limit, clamp_min_interval, AdmissionPolicy, CriticalBypass, DEFAULT_DAILY_LIMIT,
    DEFAULT_MIN_INTERVAL_SECS,
};
use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::quiet_hours::QuietHoursConfig;

pub const MIN_TICK_INTERVAL_SECS: u64 = 10;
pub const MAX_TICK_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const MAX_QUIET_HOURS_MARGIN_SECS: u64 = 60 * 60;
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial daily quota. The stored state wins once it exists.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    /// Period of the expiry sweep and queue drain.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Extra delay after quiet hours end before a deferred item is shown.
    #[serde(default = "default_quiet_hours_margin_secs")]
    pub quiet_hours_margin_secs: u64,
    /// IANA zone used for calendar days and time-of-day windows.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Hold the queue drain while quiet hours are active.
    #[serde(default = "default_true")]
    pub drain_respects_quiet_hours: bool,
    /// Put an item back in the queue when the channel rejects it.
    #[serde(default)]
    pub requeue_on_delivery_failure: bool,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub quiet_hours: QuietHoursConfig,
    /// Checks a critical notification may skip on the immediate-send path.
    #[serde(default = "default_critical_bypass")]
    pub critical_bypass: CriticalBypass,
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}
fn default_min_interval_secs() -> u64 {
    DEFAULT_MIN_INTERVAL_SECS
}
fn default_tick_interval_secs() -> u64 {
    300
}
fn default_quiet_hours_margin_secs() -> u64 {
    60
}
fn default_timezone() -> Tz {
    chrono_tz::UTC
}
fn default_true() -> bool {
    true
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_critical_bypass() -> CriticalBypass {
    CriticalBypass::FULL
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            min_interval_secs: default_min_interval_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            quiet_hours_margin_secs: default_quiet_hours_margin_secs(),
            timezone: default_timezone(),
            drain_respects_quiet_hours: true,
            requeue_on_delivery_failure: false,
            history_limit: default_history_limit(),
            quiet_hours: QuietHoursConfig::default(),
            critical_bypass: default_critical_bypass(),
        }
    }
}

impl EngineConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |current, part| current.get(part))
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent) = parent {
            for part in parent.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .trim()
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => {
                let value = value.trim();
                if let Ok(n) = value.parse::<u64>() {
                    serde_json::Value::Number(n.into())
                } else if let Ok(n) = value.parse::<i64>() {
                    serde_json::Value::Number(n.into())
                } else {
                    return Err(invalid(format!("cannot parse '{value}' as number")));
                }
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// `<data dir>/config.toml`
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default file cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, falling back to defaults with a warning.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "using default engine configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every leaf key with its current value, in dot notation.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Copy with every value pulled into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            daily_limit: clamp_daily_limit(i64::from(self.daily_limit)),
            min_interval_secs: clamp_min_interval(self.min_interval_secs),
            tick_interval_secs: self
                .tick_interval_secs
                .clamp(MIN_TICK_INTERVAL_SECS, MAX_TICK_INTERVAL_SECS),
            quiet_hours_margin_secs: self.quiet_hours_margin_secs.min(MAX_QUIET_HOURS_MARGIN_SECS),
            history_limit: self.history_limit.min(MAX_HISTORY_LIMIT),
            ..self.clone()
        }
    }

    /// Admission policy described by this configuration. The queue drain
    /// never lets critical items skip limits.
    pub fn policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            timezone: self.timezone,
            immediate_bypass: self.critical_bypass,
            drain_bypass: CriticalBypass::NONE,
        }
    }
}
