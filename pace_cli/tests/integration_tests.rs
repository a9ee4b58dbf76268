//! Integration tests for the quitpace binary.
//!
//! These tests verify end-to-end behavior including:
//! - Onboarding and availability
//! - Logging, undo and alternative tasks
//! - The growth sweep, reports and export
//! - Reset

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const T0: &str = "2024-03-01T08:00:00Z";

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI pointed at a data dir with a fixed clock
fn cli(data_dir: &Path, now: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quitpace"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(data_dir.join("config.toml"))
        .arg("--now")
        .arg(now);
    cmd
}

fn init(data_dir: &Path) {
    cli(data_dir, T0)
        .args(["init", "20", "20", "20"])
        .assert()
        .success();
}

fn read_user(data_dir: &Path) -> Value {
    let doc: Value =
        serde_json::from_str(&fs::read_to_string(data_dir.join("users.json")).unwrap()).unwrap();
    doc["users"][0].clone()
}

fn event_lines(data_dir: &Path) -> usize {
    fs::read_to_string(data_dir.join("events.jsonl"))
        .map(|c| c.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("quitpace"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Smoking interval coach"));
}

#[test]
fn test_status_before_init_prompts_onboarding() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path(), T0)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile yet"));
}

#[test]
fn test_init_derives_interval() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir, T0)
        .args(["init", "20", "20", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting interval: 72 minutes"));

    let user = read_user(data_dir);
    assert_eq!(user["interval_minutes"], 72);
    assert_eq!(user["cigarette_cost"], 1.0);
    assert!(user["next_allowed_time"].is_null());
}

#[test]
fn test_second_init_keeps_profile() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    cli(data_dir, T0)
        .args(["init", "5", "30", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting interval: 72 minutes"));
}

#[test]
fn test_nonpositive_baseline_counts_as_one() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir, T0)
        .args(["init", "-3", "20", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting interval: 1440 minutes"));

    let user = read_user(data_dir);
    assert_eq!(user["cigarettes_per_day"], 1);
    assert_eq!(user["interval_minutes"], 1440);
}

#[test]
fn test_config_written_and_used() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let config_path = data_dir.join("config.toml");

    cli(data_dir, T0)
        .args(["config", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[alternatives]"))
        .stdout(predicate::str::contains("Saved config"));

    let written = fs::read_to_string(&config_path).expect("config written");
    fs::write(&config_path, written.replace("zł", "EUR")).unwrap();

    init(data_dir);
    cli(data_dir, T0)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spent: 0.00 EUR"));
}

#[test]
fn test_invalid_pack_size_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path(), T0)
        .args(["init", "20", "20", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cigarettes per pack"));
}

#[test]
fn test_first_smoke_is_logged() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    cli(data_dir, T0)
        .assert()
        .success()
        .stdout(predicate::str::contains("You can smoke now"));

    cli(data_dir, T0)
        .arg("smoke")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cigarette logged"))
        .stdout(predicate::str::contains("2024-03-01 09:12"));

    assert_eq!(event_lines(data_dir), 1);
    let user = read_user(data_dir);
    assert_eq!(user["spent"], 1.0);
    assert_eq!(user["days_success_streak"], 1);

    cli(data_dir, "2024-03-01T08:30:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("Too early. Next cigarette in 0h 42m"));
}

#[test]
fn test_early_smoke_offers_alternative() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir, T0).arg("smoke").assert().success();

    cli(data_dir, "2024-03-01T08:30:00Z")
        .arg("smoke")
        .assert()
        .success()
        .stdout(predicate::str::contains("Try this instead"));
    assert_eq!(event_lines(data_dir), 1);

    cli(data_dir, "2024-03-01T08:31:00Z")
        .arg("alt-done")
        .assert()
        .success()
        .stdout(predicate::str::contains("Well done"))
        .stdout(predicate::str::contains("2024-03-01 09:15"));

    cli(data_dir, "2024-03-01T08:32:00Z")
        .arg("alt-done")
        .assert()
        .success()
        .stdout(predicate::str::contains("No alternative pending"));
}

#[test]
fn test_smoking_during_alternative_is_relapse() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir, T0).arg("smoke").assert().success();
    cli(data_dir, "2024-03-01T08:30:00Z").arg("smoke").assert().success();

    cli(data_dir, "2024-03-01T08:31:00Z")
        .arg("smoke")
        .assert()
        .success()
        .stdout(predicate::str::contains("Relapse logged"))
        .stdout(predicate::str::contains("That one was early"));

    assert_eq!(event_lines(data_dir), 2);
    assert_eq!(read_user(data_dir)["early_counter"], 1);
}

#[test]
fn test_undo_within_and_after_window() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir, T0).arg("smoke").assert().success();

    cli(data_dir, "2024-03-01T08:11:00Z")
        .arg("undo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("too late to undo"));
    assert_eq!(event_lines(data_dir), 1);

    cli(data_dir, "2024-03-01T08:05:00Z")
        .arg("undo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Undone"));

    assert_eq!(event_lines(data_dir), 0);
    let user = read_user(data_dir);
    assert_eq!(user["spent"], 0.0);
    assert_eq!(user["next_allowed_time"], "2024-03-01T08:00:00Z");

    cli(data_dir, "2024-03-01T08:06:00Z")
        .arg("undo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no event to undo"));
}

#[test]
fn test_growth_after_three_on_schedule_smokes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    for now in ["2024-03-01T08:00:00Z", "2024-03-01T09:12:00Z", "2024-03-01T10:24:00Z"] {
        cli(data_dir, now).arg("smoke").assert().success();
    }
    assert_eq!(read_user(data_dir)["days_success_streak"], 3);

    cli(data_dir, "2024-03-02T02:00:00Z")
        .arg("grow")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 users, 1 grown, 0 paused"));

    let user = read_user(data_dir);
    assert_eq!(user["interval_minutes"], 82);
    assert_eq!(user["days_success_streak"], 0);
}

#[test]
fn test_weekly_report_and_stats() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir, T0).arg("smoke").assert().success();

    cli(data_dir, "2024-03-04T09:00:00Z")
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Smoked: 1 (139 under plan)"))
        .stdout(predicate::str::contains("Saved: 139.00"));

    cli(data_dir, T0)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current interval: 72 min"))
        .stdout(predicate::str::contains("Spent: 1.00"));
}

#[test]
fn test_ping_quiet_user_once() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    cli(data_dir, T0)
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("quiet for 12+ hours"));

    cli(data_dir, "2024-03-01T09:00:00Z")
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nobody to ping"));
}

#[test]
fn test_export_writes_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir, T0).arg("smoke").assert().success();
    cli(data_dir, "2024-03-01T09:20:00Z").arg("smoke").assert().success();

    let csv_path = data_dir.join("export/events.csv");
    cli(data_dir, T0)
        .arg("export")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 events"));

    let content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert!(content.contains("id,user_id,timestamp"));
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_reset_forgets_profile() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir, T0).arg("smoke").assert().success();

    cli(data_dir, T0)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 events removed"));

    assert_eq!(event_lines(data_dir), 0);
    cli(data_dir, T0)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile yet"));
}

#[test]
fn test_users_are_independent() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir, T0)
        .args(["--user", "7", "init", "10", "20", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting interval: 144 minutes"));

    cli(data_dir, T0)
        .args(["--user", "7", "smoke"])
        .assert()
        .success();

    cli(data_dir, T0)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile yet"));
}
