use clap::Subcommand;
use notigate_core::EngineConfig;

use super::engine;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "daily_limit", "quiet_hours.start")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

/// Keys the engine keeps in its stored state once that state exists.
fn is_live_key(key: &str) -> bool {
    matches!(key, "daily_limit" | "min_interval_secs" | "quiet_hours")
        || key.starts_with("quiet_hours.")
}

/// Push limit, interval and quiet hours from `config` into the stored state,
/// writing back the values the engine actually applied.
async fn apply_to_state(config: &mut EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (_, orchestrator) = engine::open()?;
    config.daily_limit = orchestrator
        .set_daily_limit(i64::from(config.daily_limit))
        .await;
    config.min_interval_secs = orchestrator.set_min_interval(config.min_interval_secs).await;
    orchestrator.set_quiet_hours(config.quiet_hours).await;
    Ok(())
}

pub async fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = EngineConfig::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = EngineConfig::load()?;
            config.set(&key, &value)?;
            if is_live_key(&key) {
                apply_to_state(&mut config).await?;
            }
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = EngineConfig::load()?;
            for (key, value) in config.entries() {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            let mut config = EngineConfig::default();
            apply_to_state(&mut config).await?;
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
