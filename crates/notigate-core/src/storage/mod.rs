mod config;
mod state_store;

pub use config::EngineConfig;
pub use state_store::{JsonFileStore, MemoryStore, StateStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the engine's data directory, creating it if needed.
///
/// `NOTIGATE_DATA_DIR` overrides the location. Otherwise
/// `~/.config/notigate/`, or `~/.config/notigate-dev/` when
/// `NOTIGATE_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("NOTIGATE_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("NOTIGATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("notigate-dev")
            } else {
                base_dir.join("notigate")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
