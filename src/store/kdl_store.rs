//! Override store persisted as a KDL file.
//!
//! # KDL Schema
//!
//! ```kdl
//! // Local overrides - one node per key, value is the serialized token
//! value "knobs.override-enabled" "true"
//! value "api.timeout" "45"
//! value "regions" "eu,us"
//! ```
//!
//! The whole file is loaded at open and rewritten atomically on every
//! mutation.

use super::{Store, write_atomic};
use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const VALUE_NODE: &str = "value";

/// Store backed by a KDL file.
#[derive(Debug, Clone)]
pub struct KdlStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl KdlStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;
        tracing::debug!("opened override store {} ({} entries)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Other(format!("Failed to read {}: {}", path.display(), e)))?;

        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Other(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;

        Ok(Self::from_kdl(&doc))
    }

    /// Parse `value "key" "token"` nodes. Malformed nodes are skipped.
    pub fn from_kdl(doc: &KdlDocument) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();

        for node in doc.nodes() {
            if node.name().value() != VALUE_NODE {
                continue;
            }
            let mut args = node
                .entries()
                .iter()
                .filter(|e| e.name().is_none())
                .filter_map(|e| e.value().as_string());
            match (args.next(), args.next()) {
                (Some(key), Some(token)) => {
                    entries.insert(key.to_string(), token.to_string());
                }
                _ => tracing::warn!("skipping malformed override node: {}", node),
            }
        }

        entries
    }

    /// Convert the entries to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        Self::render(&self.entries)
    }

    fn render(entries: &BTreeMap<String, String>) -> KdlDocument {
        let mut doc = KdlDocument::new();

        for (key, token) in entries {
            let mut node = KdlNode::new(VALUE_NODE);
            node.push(KdlEntry::new(KdlValue::String(key.clone())));
            node.push(KdlEntry::new(KdlValue::String(token.clone())));
            doc.nodes_mut().push(node);
        }

        doc.autoformat();
        doc
    }

    /// Write `entries` to disk, then adopt them. On failure the in-memory
    /// state is left untouched.
    fn commit(&mut self, entries: BTreeMap<String, String>) -> Result<()> {
        write_atomic(&self.path, &Self::render(&entries).to_string())?;
        self.entries = entries;
        Ok(())
    }
}

impl Store for KdlStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value.to_string());
        self.commit(entries)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        let mut entries = self.entries.clone();
        entries.remove(key);
        self.commit(entries)?;
        Ok(true)
    }

    fn reload(&mut self) -> Result<()> {
        self.entries = Self::load(&self.path)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = KdlStore::open(dir.path().join("overrides.kdl")).unwrap();
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn test_set_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.kdl");

        let mut store = KdlStore::open(&path).unwrap();
        store.set("api.timeout", "45").unwrap();
        store.set("greeting", "hi \"there\", friend").unwrap();

        let reopened = KdlStore::open(&path).unwrap();
        assert_eq!(reopened.get("api.timeout"), Some("45".to_string()));
        assert_eq!(
            reopened.get("greeting"),
            Some("hi \"there\", friend".to_string())
        );
    }

    #[test]
    fn test_remove_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.kdl");

        let mut store = KdlStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());

        let reopened = KdlStore::open(&path).unwrap();
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_failed_set_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut store = KdlStore::open(blocker.join("overrides.kdl")).unwrap();
        assert!(store.set("a", "1").is_err());
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_failed_remove_keeps_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.kdl");

        let mut store = KdlStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.remove("a").is_err());
        assert_eq!(store.get("a"), Some("1".to_string()));
    }

    #[test]
    fn test_reload_sees_external_edit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.kdl");

        let mut store = KdlStore::open(&path).unwrap();
        std::fs::write(&path, "value \"k\" \"external\"\n").unwrap();
        assert_eq!(store.get("k"), None);
        store.reload().unwrap();
        assert_eq!(store.get("k"), Some("external".to_string()));
    }

    #[test]
    fn test_from_kdl_skips_malformed_nodes() {
        let doc: KdlDocument = r#"
            value "good" "1"
            value "missing-token"
            other "x" "y"
        "#
        .parse()
        .unwrap();
        let entries = KdlStore::from_kdl(&doc);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("good"), Some(&"1".to_string()));
    }

    #[test]
    fn test_open_rejects_invalid_kdl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.kdl");
        std::fs::write(&path, "value \"unterminated\n").unwrap();
        assert!(KdlStore::open(&path).is_err());
    }
}
