//! Precedence resolution for tool configuration.
//!
//! ## Config Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Project config.kdl (`~/.local/share/knobs/<project-hash>/config.kdl`)
//! 3. System config.kdl (`$KNOBS_CONFIG_DIR/config.kdl` or `~/.config/knobs/config.kdl`)
//! 4. Built-in defaults
//!
//! Relative paths found in a config file are resolved against the project
//! directory. Paths given on the command line are used as given.

use crate::Result;
use crate::config::{KnobsConfig, OutputFormat};
use crate::manifest::MANIFEST_FILE;
use crate::store::REMOTE_SNAPSHOT_FILE;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "KNOBS_CONFIG_DIR";

/// File name of both the system and the project config.
pub const CONFIG_FILE: &str = "config.kdl";

/// Default log level when nothing else sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    /// Value from CLI flag
    #[serde(rename = "cli")]
    CliFlag,
    /// Value from the project's config.kdl
    Project,
    /// Value from the system config.kdl
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::CliFlag => write!(f, "cli"),
            SettingSource::Project => write!(f, "project"),
            SettingSource::System => write!(f, "system"),
            SettingSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: SettingSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: SettingSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Knob manifest path
    pub manifest: Resolved<PathBuf>,
    /// Remote snapshot path
    pub remote_snapshot: Resolved<PathBuf>,
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
    /// Log filter level
    pub log_level: Resolved<String>,
}

impl ResolvedConfig {
    /// Built-in defaults for a project.
    pub fn defaults(project_dir: &Path, data_dir: &Path) -> Self {
        Self {
            manifest: Resolved::new(project_dir.join(MANIFEST_FILE), SettingSource::Default),
            remote_snapshot: Resolved::new(
                data_dir.join(REMOTE_SNAPSHOT_FILE),
                SettingSource::Default,
            ),
            output_format: Resolved::new(OutputFormat::Json, SettingSource::Default),
            log_level: Resolved::new(DEFAULT_LOG_LEVEL.to_string(), SettingSource::Default),
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest.value
    }

    pub fn remote_snapshot(&self) -> &Path {
        &self.remote_snapshot.value
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub manifest: Option<PathBuf>,
    pub remote_snapshot: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    pub fn with_remote_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.remote_snapshot = Some(path.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

/// Path of the system config file, if a config directory can be determined.
pub fn system_config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join(CONFIG_FILE)),
        _ => dirs::config_dir().map(|d| d.join("knobs").join(CONFIG_FILE)),
    }
}

/// Path of a project's config file inside its data directory.
pub fn project_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Resolve configuration with full precedence chain.
///
/// Precedence (highest to lowest):
/// 1. CLI flags (from `overrides`)
/// 2. Project config.kdl
/// 3. System config.kdl
/// 4. Built-in defaults
pub fn resolve_config(
    project_dir: &Path,
    data_dir: &Path,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    let system_config = match system_config_path() {
        Some(path) => KnobsConfig::read_file(&path)?,
        None => KnobsConfig::new(),
    };
    let project_config = KnobsConfig::read_file(&project_config_path(data_dir))?;

    Ok(resolve_layers(
        project_dir,
        data_dir,
        overrides,
        &project_config,
        &system_config,
    ))
}

/// Apply precedence to already-loaded layers.
pub fn resolve_layers(
    project_dir: &Path,
    data_dir: &Path,
    overrides: &ConfigOverrides,
    project_config: &KnobsConfig,
    system_config: &KnobsConfig,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::defaults(project_dir, data_dir);
    let project_config = project_config.clone().anchored_at(project_dir);
    let system_config = system_config.clone().anchored_at(project_dir);

    if let Some(ref path) = overrides.manifest {
        result.manifest = Resolved::new(path.clone(), SettingSource::CliFlag);
    } else if let Some(ref path) = project_config.manifest {
        result.manifest = Resolved::new(path.clone(), SettingSource::Project);
    } else if let Some(ref path) = system_config.manifest {
        result.manifest = Resolved::new(path.clone(), SettingSource::System);
    }

    if let Some(ref path) = overrides.remote_snapshot {
        result.remote_snapshot = Resolved::new(path.clone(), SettingSource::CliFlag);
    } else if let Some(ref path) = project_config.remote_snapshot {
        result.remote_snapshot = Resolved::new(path.clone(), SettingSource::Project);
    } else if let Some(ref path) = system_config.remote_snapshot {
        result.remote_snapshot = Resolved::new(path.clone(), SettingSource::System);
    }

    if let Some(ref format) = overrides.output_format {
        result.output_format = Resolved::new(format.clone(), SettingSource::CliFlag);
    } else if let Some(ref format) = project_config.output_format {
        result.output_format = Resolved::new(format.clone(), SettingSource::Project);
    } else if let Some(ref format) = system_config.output_format {
        result.output_format = Resolved::new(format.clone(), SettingSource::System);
    }

    if let Some(ref level) = overrides.log_level {
        result.log_level = Resolved::new(level.clone(), SettingSource::CliFlag);
    } else if let Some(ref level) = project_config.log_level {
        result.log_level = Resolved::new(level.clone(), SettingSource::Project);
    } else if let Some(ref level) = system_config.log_level {
        result.log_level = Resolved::new(level.clone(), SettingSource::System);
    }

    result
}
