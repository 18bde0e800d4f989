//! `limit` and `interval`: update the live state and keep the config file in
//! step so a fresh data dir starts from the same values.

use super::engine;

pub async fn run_limit(limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, orchestrator) = engine::open()?;
    let applied = orchestrator.set_daily_limit(limit).await;
    config.daily_limit = applied;
    config.save()?;

    if i64::from(applied) != limit {
        println!("daily limit: {applied} (clamped from {limit})");
    } else {
        println!("daily limit: {applied}");
    }
    Ok(())
}

pub async fn run_interval(secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, orchestrator) = engine::open()?;
    let applied = orchestrator.set_min_interval(secs).await;
    config.min_interval_secs = applied;
    config.save()?;

    println!("minimum interval: {applied}s");
    Ok(())
}
