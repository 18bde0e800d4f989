use clap::Args;
use notigate_core::{Priority, PriorityLevel};

use super::engine;

#[derive(Args)]
pub struct SendArgs {
    /// Category tag, e.g. STREAK_WARNING
    pub category: String,
    /// minimal, low, normal, high or critical
    #[arg(long, default_value = "normal")]
    pub level: PriorityLevel,
    /// Weighted score in [0, 1]; the level's base score when omitted
    #[arg(long)]
    pub score: Option<f64>,
    /// Opaque JSON payload
    #[arg(long, default_value = "{}")]
    pub payload: String,
    /// Expire after this many seconds
    #[arg(long, allow_negative_numbers = true)]
    pub expires_in: Option<i64>,
    /// Schedule for the next best hour instead of now
    #[arg(long)]
    pub best_time: bool,
}

pub async fn run(args: SendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let payload: serde_json::Value = serde_json::from_str(&args.payload)
        .map_err(|e| format!("payload is not valid JSON: {e}"))?;

    let (_, orchestrator) = engine::open()?;
    let mut priority = match args.score {
        Some(score) => Priority::new(args.level, score),
        None => Priority::of_level(args.level),
    };
    if let Some(secs) = args.expires_in {
        let expires_at = engine::expiry_after(orchestrator.now(), secs, "--expires-in")?;
        priority = priority.with_expiry(expires_at);
    }

    let outcome = if args.best_time {
        orchestrator
            .schedule_at_best_time(args.category, priority, payload)
            .await
    } else {
        orchestrator.submit_new(args.category, priority, payload).await
    };
    engine::print_json(&outcome)
}
