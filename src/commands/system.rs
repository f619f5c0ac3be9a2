//! Project-level commands: status, remote import and tool config.

use super::{Context, Output, open_session, to_json_string};
use crate::config::{KnobsConfig, ResolvedConfig, project_config_path, system_config_path};
use crate::{Error, Result};
use crate::engine::OverrideMode;
use crate::store::SnapshotProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Build-time information baked in by build.rs.
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub built_at: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("KNOBS_GIT_COMMIT"),
            built_at: env!("KNOBS_BUILD_TIMESTAMP"),
        }
    }
}

// === Status ===

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub mode: OverrideMode,
    pub project: PathBuf,
    pub data_dir: PathBuf,
    pub manifest: PathBuf,
    pub store: String,
    pub remote: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_fetched_at: Option<DateTime<Utc>>,
    pub knobs: usize,
    pub build: BuildInfo,
}

impl Output for StatusResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let fetched = self
            .remote_fetched_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        [
            format!("knobs {} ({})", self.build.version, self.build.commit),
            format!("Project:       {}", self.project.display()),
            format!("Override mode: {}", self.mode),
            format!("Knobs:         {}", self.knobs),
            format!("Manifest:      {}", self.manifest.display()),
            format!("Overrides:     {}", self.store),
            format!("Remote:        {} (fetched {})", self.remote, fetched),
        ]
        .join("\n")
    }
}

/// Summarize the project's override state and file locations.
pub fn status(ctx: &Context) -> Result<StatusResult> {
    let session = open_session(ctx)?;
    let engine = session.engine();

    Ok(StatusResult {
        mode: session.mode(),
        project: ctx.project_dir.clone(),
        data_dir: ctx.data_dir.clone(),
        manifest: ctx.config.manifest().to_path_buf(),
        store: engine.store_location(),
        remote: engine.provider_location(),
        remote_fetched_at: engine.remote_fetched_at(),
        knobs: engine.spec().len(),
        build: BuildInfo::current(),
    })
}

// === Remote import ===

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub fetched_at: Option<DateTime<Utc>>,
    pub values: usize,
}

impl Output for ImportResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Imported {} remote value(s) from {} into {}",
            self.values,
            self.source.display(),
            self.destination.display()
        )
    }
}

/// Normalize a downloaded JSON document into the project's remote snapshot.
pub fn remote_import(ctx: &Context, source: &Path) -> Result<ImportResult> {
    let destination = ctx.config.remote_snapshot().to_path_buf();
    let snapshot = SnapshotProvider::import(source, &destination)?;
    Ok(ImportResult {
        source: source.to_path_buf(),
        destination,
        fetched_at: snapshot.fetched_at,
        values: snapshot.values.len(),
    })
}

// === Config show ===

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_config: Option<PathBuf>,
    pub project_config: PathBuf,
    pub settings: ResolvedConfig,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let s = &self.settings;
        let mut lines = Vec::new();
        if let Some(ref path) = self.system_config {
            lines.push(format!("System config:  {}", path.display()));
        }
        lines.push(format!("Project config: {}", self.project_config.display()));
        lines.push(String::new());
        lines.push(format!(
            "manifest        = {} ({})",
            s.manifest().display(),
            s.manifest.source
        ));
        lines.push(format!(
            "remote-snapshot = {} ({})",
            s.remote_snapshot().display(),
            s.remote_snapshot.source
        ));
        lines.push(format!(
            "output-format   = {} ({})",
            s.output_format(),
            s.output_format.source
        ));
        lines.push(format!(
            "log-level       = {} ({})",
            s.log_level(),
            s.log_level.source
        ));
        lines.join("\n")
    }
}

/// Show the resolved tool configuration and where each setting came from.
pub fn config_show(ctx: &Context) -> ConfigShowResult {
    ConfigShowResult {
        system_config: system_config_path(),
        project_config: project_config_path(&ctx.data_dir),
        settings: ctx.config.clone(),
    }
}

// === Config set ===

#[derive(Debug, Serialize)]
pub struct ConfigSetResult {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Write one setting into the project config, or the system config when
/// `system` is set. Other settings already in the file are kept.
pub fn config_set(
    ctx: &Context,
    key: &str,
    value: &str,
    system: bool,
) -> Result<ConfigSetResult> {
    let path = if system {
        system_config_path()
            .ok_or_else(|| Error::Other("No system config directory available".to_string()))?
    } else {
        project_config_path(&ctx.data_dir)
    };

    let setting = KnobsConfig::from_setting(key, value).map_err(Error::InvalidInput)?;
    let mut config = KnobsConfig::read_file(&path)?;
    config.merge(&setting);
    config.write_file(&path)?;
    tracing::info!("set {} in {}", key, path.display());

    Ok(ConfigSetResult {
        key: key.to_string(),
        value: value.to_string(),
        path,
    })
}
