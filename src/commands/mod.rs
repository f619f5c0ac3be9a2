//! Command implementations for the `knobs` CLI.
//!
//! Each command resolves a [`Context`], opens a [`Session`] on the project's
//! override store, remote snapshot and manifest, and returns a result type
//! that renders as JSON or human-readable text via [`Output`].

mod knobs;
mod system;

pub use knobs::{
    GetResult, KnobSummary, ListResult, OverrideResult, ResetResult, SetResult, ShowResult, get,
    list, override_mode, reset, set, show,
};
pub use system::{
    BuildInfo, ConfigSetResult, ConfigShowResult, ImportResult, StatusResult, config_set,
    config_show, remote_import, status,
};

use crate::Result;
use crate::config::{ConfigOverrides, ResolvedConfig, resolve_config};
use crate::engine::Engine;
use crate::manifest::load_manifest;
use crate::session::Session;
use crate::store::{KdlStore, OVERRIDES_FILE, SnapshotProvider, project_data_dir};
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Everything a command needs to locate a project's files.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config: ResolvedConfig,
}

impl Context {
    /// Locate the project's data directory and resolve its tool config.
    pub fn resolve(project_dir: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let data_dir = project_data_dir(project_dir)?;
        let config = resolve_config(project_dir, &data_dir, overrides)?;
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            data_dir,
            config,
        })
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.data_dir.join(OVERRIDES_FILE)
    }
}

/// Open an editing session on the project's files.
pub fn open_session(ctx: &Context) -> Result<Session> {
    let store = KdlStore::open(ctx.overrides_path())?;
    let provider = SnapshotProvider::open(ctx.config.remote_snapshot())?;
    let spec = load_manifest(ctx.config.manifest())?;

    let engine = Engine::builder()
        .store(store)
        .provider(provider)
        .spec(spec)
        .build()?;
    Ok(Session::new(engine))
}

fn to_json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::test_utils::TestEnv;

    pub const MANIFEST: &str = r#"
knob "api.timeout" kind="int" default=30 name="API timeout"
knob "feature.new-ui" kind="bool" default=#false name="New UI" group="Features" sort=1
knob "theme" kind="enum" default="dark" group="Appearance" sort=2 {
    case "dark" label="Dark"
    case "light" label="Light"
}
"#;

    /// A context whose manifest and snapshot live under the test env.
    pub fn context(env: &TestEnv) -> Context {
        let manifest = env.path().join("knobs.kdl");
        std::fs::write(&manifest, MANIFEST).unwrap();
        let data_dir = env.data_path().join("project");
        let config = crate::config::resolver::resolve_layers(
            env.path(),
            &data_dir,
            &ConfigOverrides::new(),
            &crate::config::KnobsConfig::new(),
            &crate::config::KnobsConfig::new(),
        );
        Context {
            project_dir: env.path().to_path_buf(),
            data_dir,
            config,
        }
    }

    pub fn write_remote(ctx: &Context, json: &str) {
        let path = ctx.config.remote_snapshot();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;
    use crate::engine::OverrideMode;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_open_session_on_empty_project() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let session = open_session(&ctx).unwrap();
        assert_eq!(session.mode(), OverrideMode::Locked);
        assert_eq!(session.engine().spec().len(), 3);
    }

    #[test]
    fn test_open_session_reports_broken_manifest() {
        let env = TestEnv::new();
        let ctx = context(&env);
        std::fs::write(ctx.config.manifest(), "knob \"k\" kind=\"int\"\n").unwrap();
        assert!(matches!(
            open_session(&ctx).unwrap_err(),
            crate::Error::Manifest(_)
        ));
    }

    #[test]
    fn test_overrides_path_is_in_data_dir() {
        let env = TestEnv::new();
        let ctx = context(&env);
        assert_eq!(ctx.overrides_path(), ctx.data_dir.join("overrides.kdl"));
    }
}
