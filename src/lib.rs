//! Knobs - typed configuration values with remote and local overrides.
//!
//! An application declares its knobs in a [`spec::Spec`], resolves each one
//! through [`engine::Engine`] (local override, then remote value, then the
//! compiled-in default) and projects the whole set into a grouped
//! [`schema::Schema`] for display and editing.

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod manifest;
pub mod schema;
pub mod session;
pub mod spec;
pub mod store;
pub mod value;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::engine::Engine;
    use crate::spec::{Group, Spec};
    use crate::store::{MemoryProvider, MemoryStore};

    /// Test environment with an isolated project and data directory.
    pub struct TestEnv {
        /// Simulated project directory (holds knobs.kdl)
        pub project_dir: TempDir,
        /// Isolated data directory (holds overrides.kdl and remote.json)
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                project_dir: TempDir::new().unwrap(),
                data_dir: TempDir::new().unwrap(),
            }
        }

        pub fn path(&self) -> &Path {
            self.project_dir.path()
        }

        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// A spec with one knob per value kind family, spread over two groups.
    pub fn sample_spec() -> Spec {
        let mut spec = Spec::new();
        spec.register("api.timeout", 30i64, Group::default())
            .unwrap();
        spec.register("feature.new-ui", false, Group::named("Features", 1))
            .unwrap();
        spec.register("greeting", "hello".to_string(), Group::default())
            .unwrap();
        spec
    }

    /// Engine over in-memory collaborators.
    pub fn memory_engine(spec: Spec, remote: &[(&str, &str)]) -> Engine {
        Engine::new(
            MemoryStore::new(),
            MemoryProvider::from_pairs(remote.iter().copied()),
            spec,
        )
    }
}

/// Library-level error type for knob operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidFormat(#[from] value::FormatError),

    #[error("Engine not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("Unknown knob: {0}")]
    UnknownKey(String),

    #[error("Knob declared twice: {0}")]
    DuplicateKey(String),

    #[error("Key is reserved for override mode: {0}")]
    ReservedKey(String),

    #[error("Default for knob {key} does not round-trip: {reason}")]
    InvalidDefault { key: String, reason: String },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for knob operations.
pub type Result<T> = std::result::Result<T, Error>;
