use chrono::Utc;
use clap::Args;
use notigate_core::{BestTimeScheduler, EngineConfig};

#[derive(Args)]
pub struct BestTimeArgs {
    /// Category tag, e.g. GOAL_REMINDER
    pub category: String,
    /// Most active hours (comma separated); category defaults when omitted
    #[arg(long, value_delimiter = ',')]
    pub hours: Vec<u8>,
}

pub fn run(args: BestTimeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load_or_default();
    let scheduler = BestTimeScheduler::new(config.timezone);
    let at = scheduler.best_time(&args.category, &args.hours, Utc::now());
    println!("{}", at.with_timezone(&config.timezone).to_rfc3339());
    Ok(())
}
