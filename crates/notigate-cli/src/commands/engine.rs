//! Shared engine setup for commands that touch admission state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use notigate_core::{CoreError, EngineConfig, JsonFileStore, LogChannel, Orchestrator};
use tracing::debug;

/// Load the configuration and open the engine on `<data dir>/state.json`.
///
/// The queue is not persisted, so anything left queued when the command
/// exits is dropped.
pub fn open() -> Result<(EngineConfig, Orchestrator), CoreError> {
    let config = EngineConfig::load_or_default();
    let store = JsonFileStore::in_data_dir()?;
    debug!(path = %store.path().display(), "opening state store");
    let orchestrator = Orchestrator::new(&config, Arc::new(LogChannel), Arc::new(store));
    Ok((config, orchestrator))
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `now` plus `secs` seconds, or an error naming `flag` when the result does
/// not fit in a timestamp.
pub fn expiry_after(
    now: DateTime<Utc>,
    secs: i64,
    flag: &str,
) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Duration::try_seconds(secs)
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or_else(|| format!("{flag} out of range: {secs}").into())
}
