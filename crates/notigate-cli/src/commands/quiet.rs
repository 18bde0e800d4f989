use chrono::NaiveTime;
use clap::Subcommand;
use notigate_core::QuietHoursConfig;

use super::engine;

#[derive(Subcommand)]
pub enum QuietAction {
    /// Show the quiet-hours window and whether it is active
    Status,
    /// Enable quiet hours from START to END (HH:MM, may wrap midnight)
    Set { start: String, end: String },
    /// Disable quiet hours, keeping the window
    Off,
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, Box<dyn std::error::Error>> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| format!("invalid time '{raw}' (expected HH:MM): {e}").into())
}

pub async fn run(action: QuietAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, orchestrator) = engine::open()?;

    match action {
        QuietAction::Status => {
            let quiet = orchestrator.state().await.quiet_hours;
            let remaining = orchestrator.quiet_hours_remaining().await;
            let window = format!("{}-{}", quiet.start.format("%H:%M"), quiet.end.format("%H:%M"));
            match (quiet.enabled, remaining) {
                (false, _) => println!("off ({window})"),
                (true, Some(left)) => {
                    println!("active {window}, ends in {} min", left.num_minutes())
                }
                (true, None) => println!("on {window}, not active"),
            }
        }
        QuietAction::Set { start, end } => {
            let quiet = QuietHoursConfig::new(parse_hhmm(&start)?, parse_hhmm(&end)?);
            orchestrator.set_quiet_hours(quiet).await;
            config.quiet_hours = quiet;
            config.save()?;
            println!(
                "quiet hours: {}-{}",
                quiet.start.format("%H:%M"),
                quiet.end.format("%H:%M")
            );
        }
        QuietAction::Off => {
            let quiet = orchestrator.state().await.quiet_hours.disabled();
            orchestrator.set_quiet_hours(quiet).await;
            config.quiet_hours = quiet;
            config.save()?;
            println!("quiet hours: off");
        }
    }
    Ok(())
}
