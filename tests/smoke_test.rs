//! Smoke tests for the knobs CLI.
//!
//! These tests verify basic CLI functionality:
//! - `knobs --version` outputs version info
//! - `knobs --help` outputs help text
//! - `knobs` (no args) outputs status as JSON

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

/// Get a Command for the knobs binary.
fn knobs() -> Command {
    Command::new(env!("CARGO_BIN_EXE_knobs"))
}

#[test]
fn test_version_flag() {
    knobs()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("knobs"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    knobs()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("override"));
}

#[test]
fn test_no_args_outputs_status_json() {
    let env = TestEnv::new();
    let status = env.json(&[]);
    assert_eq!(status["mode"], "locked");
    assert_eq!(status["knobs"], 0);
    assert_eq!(status["build"]["version"], "0.1.0");
}

#[test]
fn test_human_status() {
    let env = TestEnv::with_manifest();
    env.knobs()
        .args(["status", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Override mode: locked"))
        .stdout(predicate::str::contains("Knobs:         5"));
}

#[test]
fn test_missing_project_path_is_error() {
    let env = TestEnv::new();
    env.knobs()
        .args(["-C", "/definitely/not/here", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unknown_key_error_human() {
    let env = TestEnv::with_manifest();
    env.knobs()
        .args(["get", "nope", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Unknown knob: nope"));
}

#[test]
fn test_verbose_logs_data_dir() {
    let env = TestEnv::new();
    env.knobs()
        .args(["-v", "status"])
        .assert()
        .success()
        .stderr(predicate::str::contains("uses data dir"));
}

#[test]
fn test_quiet_by_default() {
    let env = TestEnv::new();
    env.knobs()
        .arg("status")
        .assert()
        .success()
        .stderr(predicate::str::contains("uses data dir").not());
}
