//! Corruption recovery tests for quitpace.
//!
//! These tests verify the CLI handles damaged data files sensibly:
//! - Torn lines in the event log are skipped
//! - Corrupted session state falls back to defaults
//! - A corrupted user store is reported, not silently replaced

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const T0: &str = "2024-03-01T08:00:00Z";

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quitpace"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(data_dir.join("config.toml"))
        .arg("--now")
        .arg(T0);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn init(data_dir: &Path) {
    cli(data_dir).args(["init", "20", "20", "20"]).assert().success();
}

#[test]
fn test_partial_event_line() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    cli(data_dir).arg("smoke").assert().success();

    // Simulate a crash in the middle of a write
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(data_dir.join("events.jsonl"))
        .unwrap();
    write!(file, r#"{{"id":2,"user_id":"#).unwrap();
    drop(file);

    Command::new(assert_cmd::cargo::cargo_bin!("quitpace"))
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(data_dir.join("config.toml"))
        .arg("--now")
        .arg("2024-03-01T09:30:00Z")
        .arg("smoke")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cigarette logged"));

    let content = fs::read_to_string(data_dir.join("events.jsonl")).unwrap();
    let valid = content
        .lines()
        .filter(|l| serde_json::from_str::<serde_json::Value>(l).is_ok())
        .count();
    assert_eq!(valid, 2);
}

#[test]
fn test_corrupted_session_state() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    fs::write(data_dir.join("session.json"), "{ not valid json at all }").unwrap();

    cli(data_dir)
        .arg("smoke")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cigarette logged"));
}

#[test]
fn test_corrupted_user_store_is_an_error() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    fs::write(data_dir.join("users.json"), "{ invalid").unwrap();

    cli(data_dir)
        .arg("smoke")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));

    // The damaged file is left for manual recovery
    let content = fs::read_to_string(data_dir.join("users.json")).unwrap();
    assert_eq!(content, "{ invalid");
}

#[test]
fn test_empty_event_log() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    fs::write(data_dir.join("events.jsonl"), "").unwrap();

    cli(data_dir)
        .arg("undo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no event to undo"));
}
