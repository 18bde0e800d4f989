use serde::Serialize;

use notigate_core::{AdmissionState, QueueStatistics};

use super::engine;

#[derive(Serialize)]
struct Status {
    timezone: String,
    min_interval_secs: u64,
    quiet_hours_remaining_secs: Option<i64>,
    state: AdmissionState,
    statistics: QueueStatistics,
}

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (config, orchestrator) = engine::open()?;
    let state = orchestrator.state().await;
    let statistics = orchestrator.statistics().await;
    let remaining = orchestrator.quiet_hours_remaining().await;

    if json {
        return engine::print_json(&Status {
            timezone: config.timezone.name().to_string(),
            min_interval_secs: state.throttle.min_interval_secs,
            quiet_hours_remaining_secs: remaining.map(|d| d.num_seconds()),
            state,
            statistics,
        });
    }

    println!(
        "sent today:   {}/{} ({} remaining)",
        statistics.sent_today, statistics.limit, statistics.remaining_quota
    );
    println!(
        "throttle:     {}s{}",
        state.throttle.min_interval_secs,
        if statistics.is_throttling { " (active)" } else { "" }
    );
    let quiet = &state.quiet_hours;
    match (quiet.enabled, remaining) {
        (false, _) => println!("quiet hours:  off"),
        (true, Some(left)) => println!(
            "quiet hours:  {}-{} (active, {} min left)",
            quiet.start.format("%H:%M"),
            quiet.end.format("%H:%M"),
            left.num_minutes()
        ),
        (true, None) => println!(
            "quiet hours:  {}-{}",
            quiet.start.format("%H:%M"),
            quiet.end.format("%H:%M")
        ),
    }
    println!("timezone:     {}", config.timezone.name());
    Ok(())
}
