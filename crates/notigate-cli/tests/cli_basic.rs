//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data dir.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_notigate"))
        .args(args)
        .env("NOTIGATE_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "command {args:?} failed: {stderr}");
    stdout
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_ok(data_dir, args);
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_config_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "daily_limit"]).trim(), "20");
    assert_eq!(run_ok(dir.path(), &["config", "get", "min_interval_secs"]).trim(), "300");
    assert!(dir.path().join("config.toml").exists());

    let list = run_ok(dir.path(), &["config", "list"]);
    assert!(list.contains("quiet_hours.start = 22:00"));
}

#[test]
fn test_config_set_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["config", "set", "timezone", "Europe/Istanbul"]);
    assert_eq!(
        run_ok(dir.path(), &["config", "get", "timezone"]).trim(),
        "Europe/Istanbul"
    );

    run_ok(dir.path(), &["config", "reset"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "timezone"]).trim(), "UTC");
}

#[test]
fn test_config_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "volume", "3"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "daily_limit", "many"]);
    assert_ne!(code, 0);

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "nope"]);
    assert_ne!(code, 0);
}

#[test]
fn test_limit_is_clamped_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(dir.path(), &["limit", "99"]);
    assert!(out.contains("daily limit: 50 (clamped from 99)"));

    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["statistics"]["limit"], 50);
    assert_eq!(run_ok(dir.path(), &["config", "get", "daily_limit"]).trim(), "50");

    let out = run_ok(dir.path(), &["limit", "-3"]);
    assert!(out.contains("daily limit: 1"));
}

#[test]
fn test_config_set_reaches_live_state() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["limit", "20"]);

    run_ok(dir.path(), &["config", "set", "daily_limit", "3"]);
    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["statistics"]["limit"], 3);

    run_ok(dir.path(), &["config", "set", "daily_limit", "99"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "daily_limit"]).trim(), "50");
    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["statistics"]["limit"], 50);

    run_ok(dir.path(), &["config", "set", "min_interval_secs", "42"]);
    run_ok(dir.path(), &["config", "set", "quiet_hours.enabled", "true"]);
    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["min_interval_secs"], 42);
    assert_eq!(status["state"]["quiet_hours"]["enabled"], true);

    run_ok(dir.path(), &["config", "reset"]);
    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["statistics"]["limit"], 20);
    assert_eq!(status["state"]["quiet_hours"]["enabled"], false);
}

#[test]
fn test_interval() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_ok(dir.path(), &["interval", "60"]).contains("60s"));
    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["min_interval_secs"], 60);
}

#[test]
fn test_quiet_hours_commands() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_ok(dir.path(), &["quiet", "status"]).starts_with("off"));

    let out = run_ok(dir.path(), &["quiet", "set", "22:00", "08:00"]);
    assert!(out.contains("22:00-08:00"));
    assert_eq!(
        run_ok(dir.path(), &["config", "get", "quiet_hours.enabled"]).trim(),
        "true"
    );
    let status = run_ok(dir.path(), &["quiet", "status"]);
    assert!(status.contains("22:00-08:00"));

    assert!(run_ok(dir.path(), &["quiet", "off"]).contains("off"));
    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["state"]["quiet_hours"]["enabled"], false);

    let (_, _, code) = run_cli(dir.path(), &["quiet", "set", "25:00", "08:00"]);
    assert_ne!(code, 0);
}

#[test]
fn test_best_time() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_ok(dir.path(), &["best-time", "GOAL_REMINDER", "--hours", "9,14,20"]);
    let at = chrono::DateTime::parse_from_rfc3339(out.trim()).expect("rfc3339 output");
    use chrono::Timelike;
    assert!([9, 14, 20].contains(&at.hour()));
    assert_eq!(at.minute(), 0);
    assert!(at > chrono::Utc::now());
}

#[test]
fn test_send_then_throttled() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_json(dir.path(), &["send", "GOAL_REMINDER", "--payload", r#"{"title":"Run"}"#]);
    assert_eq!(first["outcome"], "sent");

    let second = run_json(dir.path(), &["send", "HABIT_REMINDER"]);
    assert_eq!(second["outcome"], "queued");
    assert!(second["reason"].as_str().unwrap().contains("throttled"));

    let critical = run_json(dir.path(), &["send", "STREAK_WARNING", "--level", "critical"]);
    assert_eq!(critical["outcome"], "sent");

    let status = run_json(dir.path(), &["status", "--json"]);
    assert_eq!(status["statistics"]["sent_today"], 2);
}

#[test]
fn test_send_rejects_bad_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["send", "X", "--payload", "{nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("payload is not valid JSON"));

    let (_, _, code) = run_cli(dir.path(), &["send", "X", "--level", "urgent"]);
    assert_ne!(code, 0);
}

#[test]
fn test_send_expired() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["send", "X", "--expires-in=-10"]);
    assert_eq!(out["outcome"], "expired");
}

#[test]
fn test_expiry_out_of_range_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["send", "X", "--expires-in", "9223372036854775807"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: --expires-in out of range"), "{stderr}");

    let file = dir.path().join("replay.json");
    std::fs::write(&file, r#"[{"category": "X", "expires_in": -9223372036854775807}]"#).unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["replay", file.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("expires_in out of range"), "{stderr}");
}

#[test]
fn test_replay_drains_in_priority_order() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["interval", "0"]);

    let file = dir.path().join("replay.json");
    std::fs::write(
        &file,
        r#"[
            {"category": "SUGGESTION", "level": "low"},
            {"category": "GOAL_REMINDER", "level": "high", "score": 0.9},
            {"category": "STALE", "level": "critical", "expires_in": -60},
            {"category": "HABIT_REMINDER"}
        ]"#,
    )
    .unwrap();

    let result = run_json(dir.path(), &["replay", file.to_str().unwrap()]);
    assert_eq!(result["queued"], 4);
    assert_eq!(result["report"]["expired"], 1);
    assert_eq!(result["report"]["dispatched"], 3);

    let categories: Vec<_> = result["dispatched"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["category"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(categories, vec!["GOAL_REMINDER", "HABIT_REMINDER", "SUGGESTION"]);
}

#[test]
fn test_replay_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["replay", "/nonexistent/replay.json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("cannot read"));
}
