//! Common test utilities for knobs integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/knobs/` or `~/.config/knobs/` directories.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Manifest used by most CLI tests.
pub const SAMPLE_MANIFEST: &str = r#"
knob "api.timeout" kind="int" default=30 name="API timeout"
knob "greeting" kind="string" default="hello"
knob "feature.new-ui" kind="bool" default=#false name="New UI" group="Features" sort=1
knob "theme" kind="enum" default="dark" group="Appearance" sort=2 {
    case "dark" label="Dark"
    case "light" label="Light"
}
knob "regions" kind="list" of="string" default="eu,us" group="Features" sort=1
"#;

/// A test environment with isolated data and config storage.
///
/// Each `TestEnv` creates three temporary directories:
/// - `project_dir`: Acts as the project root (holds knobs.kdl)
/// - `data_dir`: Holds knobs' data (via `KNOBS_DATA_DIR` env var)
/// - `config_dir`: Holds the system config (via `KNOBS_CONFIG_DIR` env var)
///
/// The `knobs()` method sets these per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub project_dir: TempDir,
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with the sample manifest in place.
    pub fn with_manifest() -> Self {
        let env = Self::new();
        env.write_project_file("knobs.kdl", SAMPLE_MANIFEST);
        env
    }

    /// Get a Command for the knobs binary with isolated directories.
    pub fn knobs(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_knobs"));
        cmd.current_dir(self.project_dir.path());
        cmd.env("KNOBS_DATA_DIR", self.data_dir.path());
        cmd.env("KNOBS_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("KNOBS_PROJECT");
        cmd.env_remove("KNOBS_LOG");
        cmd
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.knobs().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "knobs {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Write a file relative to the project directory.
    pub fn write_project_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.project_dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Get the path to the project directory.
    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Get the path to the system config directory.
    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
