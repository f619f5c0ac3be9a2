//! Remote values cached as a JSON snapshot.
//!
//! Fetching remote values is left to the caller; once a key/value document
//! has been downloaded, `knobs remote import` (or [`SnapshotProvider::import`])
//! normalizes it into the snapshot file read by [`SnapshotProvider`]:
//!
//! ```json
//! {
//!   "fetched_at": "2026-01-31T09:00:00Z",
//!   "values": { "api.timeout": 60, "feature.new-ui": true, "regions": ["eu", "us"] }
//! }
//! ```
//!
//! A bare JSON object is also accepted and treated as the `values` map.

use super::{Provider, write_atomic};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A fetched remote key/value document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the document was imported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,

    /// Raw remote values keyed by knob key
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl Snapshot {
    /// Parse either the envelope form or a bare object of values.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(map) = doc else {
            return Err(Error::InvalidInput(
                "remote snapshot must be a JSON object".to_string(),
            ));
        };

        if map.get("values").is_some_and(serde_json::Value::is_object) {
            let ignored: Vec<&str> = map
                .keys()
                .map(String::as_str)
                .filter(|k| !matches!(*k, "values" | "fetched_at"))
                .collect();
            if !ignored.is_empty() {
                tracing::warn!(
                    "reading snapshot as envelope, ignoring top-level keys: {}",
                    ignored.join(", ")
                );
            }
            return Ok(serde_json::from_value(serde_json::Value::Object(map))?);
        }

        Ok(Self {
            fetched_at: None,
            values: map.into_iter().collect(),
        })
    }

    /// Serialized token for a key, if present and not null.
    pub fn token(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(token_for)
    }
}

/// Convert a raw JSON value to a knob token.
///
/// Strings are taken as-is, numbers and booleans use their JSON text, arrays
/// become comma-joined element tokens and objects stay JSON documents.
pub fn token_for(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(token_for)
                .collect::<Vec<_>>()
                .join(","),
        ),
        serde_json::Value::Object(_) => Some(value.to_string()),
    }
}

/// Provider reading a snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    path: PathBuf,
    snapshot: Snapshot,
}

impl SnapshotProvider {
    /// Open the snapshot at `path`. A missing file is an empty snapshot.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = Self::load(&path)?;
        tracing::debug!(
            "opened remote snapshot {} ({} values)",
            path.display(),
            snapshot.values.len()
        );
        Ok(Self { path, snapshot })
    }

    fn load(path: &Path) -> Result<Snapshot> {
        if !path.exists() {
            return Ok(Snapshot::default());
        }
        let content = std::fs::read_to_string(path)?;
        Snapshot::parse(&content)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Raw remote document.
    pub fn provide(&self) -> BTreeMap<String, serde_json::Value> {
        self.snapshot.values.clone()
    }

    /// Normalize a downloaded document at `source` into a snapshot at `dest`,
    /// stamped with the current time.
    pub fn import(source: &Path, dest: &Path) -> Result<Snapshot> {
        let content = std::fs::read_to_string(source)
            .map_err(|e| Error::Other(format!("Failed to read {}: {}", source.display(), e)))?;
        let mut snapshot = Snapshot::parse(&content)?;
        snapshot.fetched_at = Some(Utc::now());

        write_atomic(dest, &serde_json::to_string_pretty(&snapshot)?)?;
        tracing::info!(
            "imported {} remote values into {}",
            snapshot.values.len(),
            dest.display()
        );
        Ok(snapshot)
    }
}

impl Provider for SnapshotProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.snapshot.token(key)
    }

    fn reload(&mut self) -> Result<()> {
        self.snapshot = Self::load(&self.path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.fetched_at
    }
}
