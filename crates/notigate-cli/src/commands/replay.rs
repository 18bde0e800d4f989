use std::path::Path;

use serde::{Deserialize, Serialize};

use notigate_core::{HistoryEntry, Priority, PriorityLevel, TickReport};

use super::engine;

/// One entry of a replay file.
#[derive(Debug, Deserialize)]
struct ReplayEntry {
    category: String,
    #[serde(default = "default_level")]
    level: PriorityLevel,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    payload: serde_json::Value,
    /// Seconds from now
    #[serde(default)]
    expires_in: Option<i64>,
}

fn default_level() -> PriorityLevel {
    PriorityLevel::Normal
}

#[derive(Serialize)]
struct ReplayResult {
    queued: usize,
    report: TickReport,
    dispatched: Vec<HistoryEntry>,
}

pub async fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let entries: Vec<ReplayEntry> = serde_json::from_str(&content)
        .map_err(|e| format!("invalid replay file {}: {e}", file.display()))?;

    let (_, orchestrator) = engine::open()?;
    let now = orchestrator.now();
    let queued = entries.len();
    for entry in entries {
        let mut priority = match entry.score {
            Some(score) => Priority::new(entry.level, score),
            None => Priority::of_level(entry.level),
        };
        if let Some(secs) = entry.expires_in {
            priority = priority.with_expiry(engine::expiry_after(now, secs, "expires_in")?);
        }
        orchestrator
            .enqueue(entry.category, priority, entry.payload, None)
            .await;
    }

    let report = orchestrator.tick().await;
    engine::print_json(&ReplayResult {
        queued,
        report,
        dispatched: orchestrator.history().await,
    })
}
