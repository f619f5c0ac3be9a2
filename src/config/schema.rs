//! KDL schema for config.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation functions

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Setting names accepted in config.kdl.
pub const SETTING_KEYS: [&str; 4] = ["manifest", "remote-snapshot", "output-format", "log-level"];

/// Log levels accepted by `log-level`.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// manifest "knobs.kdl"                 // relative to the project directory
/// remote-snapshot "/srv/cache/remote.json"
/// output-format "human"                // or "json"
/// log-level "info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnobsConfig {
    /// Path of the knob manifest
    pub manifest: Option<PathBuf>,

    /// Path of the cached remote snapshot
    pub remote_snapshot: Option<PathBuf>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Default log filter level
    pub log_level: Option<String>,
}

impl KnobsConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {}",
                    LOG_LEVELS.join("/"),
                    level
                ));
            }
        }
        Ok(())
    }

    /// Build a config holding one setting, as typed on the command line.
    pub fn from_setting(key: &str, value: &str) -> Result<Self, String> {
        let mut config = Self::new();
        match key {
            "manifest" => config.manifest = Some(PathBuf::from(value)),
            "remote-snapshot" => config.remote_snapshot = Some(PathBuf::from(value)),
            "output-format" => {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    format!("output-format must be json or human, got {}", value)
                })?;
                config.output_format = Some(format);
            }
            "log-level" => config.log_level = Some(value.to_lowercase()),
            other => {
                return Err(format!(
                    "unknown setting {}, expected one of {}",
                    other,
                    SETTING_KEYS.join("/")
                ));
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_string(doc, "manifest") {
            config.manifest = Some(PathBuf::from(s));
        }

        if let Some(s) = first_string(doc, "remote-snapshot") {
            config.remote_snapshot = Some(PathBuf::from(s));
        }

        if let Some(s) = first_string(doc, "output-format") {
            config.output_format = OutputFormat::parse(&s);
        }

        if let Some(s) = first_string(doc, "log-level") {
            let level = s.to_lowercase();
            if LOG_LEVELS.contains(&level.as_str()) {
                config.log_level = Some(level);
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref manifest) = self.manifest {
            push_string(&mut doc, "manifest", &manifest.display().to_string());
        }

        if let Some(ref snapshot) = self.remote_snapshot {
            push_string(&mut doc, "remote-snapshot", &snapshot.display().to_string());
        }

        if let Some(ref format) = self.output_format {
            push_string(&mut doc, "output-format", format.as_str());
        }

        if let Some(ref level) = self.log_level {
            push_string(&mut doc, "log-level", level);
        }

        doc.autoformat();
        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &KnobsConfig) {
        if other.manifest.is_some() {
            self.manifest = other.manifest.clone();
        }
        if other.remote_snapshot.is_some() {
            self.remote_snapshot = other.remote_snapshot.clone();
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
    }

    /// Resolve relative paths against `base`.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        self.manifest = self.manifest.map(|p| base.join(p));
        self.remote_snapshot = self.remote_snapshot.map(|p| base.join(p));
        self
    }

    /// Read a config file. Returns an empty config if the file doesn't exist.
    pub fn read_file(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Other(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let doc: KdlDocument = content.parse().map_err(|e| {
            crate::Error::Other(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;

        Ok(Self::from_kdl(&doc))
    }

    /// Write a config file, creating parent directories.
    pub fn write_file(&self, path: &Path) -> crate::Result<()> {
        self.validate().map_err(crate::Error::InvalidInput)?;
        crate::store::write_atomic(path, &self.to_kdl().to_string())
    }
}

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(|s| s.to_string())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}
