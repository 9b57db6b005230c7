//! Basic CLI E2E tests.
//!
//! Tests run the built binary against a throwaway data directory and
//! verify the JSON it prints.

use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_choreflow-cli"))
        .args(args)
        .env("CHOREFLOW_DATA_DIR", data_dir)
        .env_remove("CHOREFLOW_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "command {args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn submit(data_dir: &Path, task: &str, at: &str) -> String {
    let created = run_json(
        data_dir,
        &[
            "completion", "create", "--task", task, "--user", "kid", "--family", "fam",
            "--points", "5", "--at", at,
        ],
    );
    assert_eq!(created["status"], "pending");
    created["id"].as_str().unwrap().to_string()
}

#[test]
fn test_completion_approve_flow() {
    let dir = TempDir::new().unwrap();
    let id = submit(dir.path(), "dishes", "2024-01-01T18:00:00Z");

    let pending = run_json(dir.path(), &["completion", "pending", "--family", "fam"]);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let outcome = run_json(
        dir.path(),
        &["completion", "approve", &id, "--by", "parent", "--frequency", "daily"],
    );
    assert_eq!(outcome["completion"]["status"], "approved");
    assert_eq!(outcome["streak"]["longest_streak"], 1);

    let (_, stderr, code) = run_cli(dir.path(), &["completion", "approve", &id, "--by", "parent"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("INVALID_STATE"), "stderr: {stderr}");
}

#[test]
fn test_self_approval_refused() {
    let dir = TempDir::new().unwrap();
    let id = submit(dir.path(), "dishes", "2024-01-01T18:00:00Z");

    let check = run_json(
        dir.path(),
        &["completion", "validate", &id, "--action", "approve", "--user", "kid"],
    );
    assert_eq!(check["valid"], false);

    let (_, stderr, code) = run_cli(dir.path(), &["completion", "approve", &id, "--by", "kid"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("SELF_APPROVAL"), "stderr: {stderr}");
}

#[test]
fn test_duplicate_pending_refused() {
    let dir = TempDir::new().unwrap();
    submit(dir.path(), "dishes", "2024-01-01T18:00:00Z");
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["completion", "create", "--task", "dishes", "--user", "kid", "--family", "fam"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("DUPLICATE_PENDING"), "stderr: {stderr}");
}

#[test]
fn test_holiday_add_list_remove() {
    let dir = TempDir::new().unwrap();
    let added = run_json(
        dir.path(),
        &["holiday", "add", "--family", "fam", "--date", "2024-12-25", "--name", "Christmas"],
    );
    assert_eq!(added["affects_all_tasks"], true);
    let id = added["id"].as_str().unwrap().to_string();

    let scoped = run_json(
        dir.path(),
        &[
            "holiday", "add", "--family", "fam", "--date", "2024-07-04", "--name", "Camp",
            "--user", "kid",
        ],
    );
    assert_eq!(scoped["affects_all_tasks"], false);

    let listed = run_json(dir.path(), &["holiday", "list", "--family", "fam"]);
    assert_eq!(listed[0]["name"], "Camp");

    let removed = run_json(dir.path(), &["holiday", "remove", &id]);
    assert_eq!(removed["removed"], true);
    let removed = run_json(dir.path(), &["holiday", "remove", &id]);
    assert_eq!(removed["removed"], false);
}

#[test]
fn test_streak_history_and_allowance() {
    let dir = TempDir::new().unwrap();
    let id = submit(dir.path(), "bed", "2024-02-01T08:00:00Z");
    run_json(dir.path(), &["completion", "approve", &id, "--by", "parent"]);

    let summary = run_json(dir.path(), &["streak", "summary", "--user", "kid"]);
    assert_eq!(summary["total_streaks"], 1);

    run_json(
        dir.path(),
        &["streak", "milestone", "--user", "kid", "--task", "bed", "--family", "fam", "--value", "7"],
    );
    let history = run_json(dir.path(), &["history", "list", "--family", "fam"]);
    assert_eq!(history[0]["kind"], "milestone");
    let meta = run_json(dir.path(), &["history", "metadata", "--family", "fam"]);
    assert_eq!(meta["total_milestones_reached"], 1);

    let totals = run_json(dir.path(), &["allowance", "summary", "--family", "fam"]);
    assert_eq!(totals["total_points"], 5);

    let report = run_json(dir.path(), &["streak", "check", "--family", "fam"]);
    assert_eq!(report["family_id"], "fam");
}

#[test]
fn test_config_set_and_get() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "history.capacity", "50"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "history.capacity"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "50");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "history.capacity", "0"]);
    assert_ne!(code, 0);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_ne!(code, 0);

    let grace = "streak.daily_check_grace_days";
    let (_, _, code) = run_cli(dir.path(), &["config", "set", grace, "4"]);
    assert_eq!(code, 0);
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", grace, "none"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", grace]);
    assert_eq!(stdout.trim(), "null");
}

#[test]
fn test_completions_script() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("choreflow-cli"));
}
