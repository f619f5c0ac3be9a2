//! Local override stores and remote value providers.
//!
//! The engine reads knob tokens from two collaborators:
//! - a [`Store`] holding local developer overrides (mutable)
//! - a [`Provider`] holding an already-fetched remote snapshot (read-only)
//!
//! Implementations:
//! - [`MemoryStore`] / [`MemoryProvider`] - in-process maps
//! - [`KdlStore`] - `overrides.kdl` in the project data directory
//! - [`SnapshotProvider`] - `remote.json` written by `knobs remote import`

pub mod kdl_store;
pub mod snapshot;

pub use kdl_store::KdlStore;
pub use snapshot::{Snapshot, SnapshotProvider};

use chrono::{DateTime, Utc};
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable overriding the base data directory.
pub const DATA_DIR_ENV: &str = "KNOBS_DATA_DIR";

/// File name of the override store inside a project data directory.
pub const OVERRIDES_FILE: &str = "overrides.kdl";

/// Default file name of the remote snapshot inside a project data directory.
pub const REMOTE_SNAPSHOT_FILE: &str = "remote.json";

/// Mutable local store of serialized override values.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Returns whether it was present.
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// Re-read persisted state, if any.
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    /// Storage location description (for display purposes).
    fn location(&self) -> String;
}

/// Read-only source of remote-originated serialized values.
pub trait Provider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Re-read the cached snapshot, if any.
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    /// Snapshot location description (for display purposes).
    fn location(&self) -> String;

    /// When the cached remote values were fetched, if known.
    fn fetched_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Store backed by an in-process map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Provider backed by an in-process map.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    values: BTreeMap<String, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Provider for MemoryProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Get the data directory for a project.
///
/// Uses a hash of the project path to create a unique directory under
/// `$KNOBS_DATA_DIR` or `~/.local/share/knobs/`.
pub fn project_data_dir(project_path: &Path) -> Result<PathBuf> {
    let base = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?
            .join("knobs"),
    };

    let canonical = project_path
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize project path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());

    Ok(base.join(&hash_hex[..12]))
}

/// Replace `path` with `content` via a temporary file in the same directory.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
