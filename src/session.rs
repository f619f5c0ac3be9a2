//! Editing session: applies UI edit events and keeps the schema current.
//!
//! Every event maps to one engine operation and then recomputes the schema
//! from scratch. A rejected edit leaves both the store and the schema as they
//! were.

use crate::engine::{Engine, OverrideMode};
use crate::schema::{Schema, project_engine};
use crate::{Error, Result};

/// An engine plus the schema last projected from it.
#[derive(Debug)]
pub struct Session {
    engine: Engine,
    schema: Schema,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        let schema = project_engine(&engine);
        Self { engine, schema }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn mode(&self) -> OverrideMode {
        self.engine.override_mode()
    }

    /// Re-read the store and provider, then re-project.
    pub fn reload(&mut self) -> Result<&Schema> {
        self.engine.reload()?;
        self.refresh();
        Ok(&self.schema)
    }

    /// Parse `token` as the knob's kind and store it as an override.
    ///
    /// Returns whether the override was written; `false` means override mode
    /// is off.
    pub fn update_value(&mut self, key: &str, token: &str) -> Result<bool> {
        let declaration = self
            .engine
            .spec()
            .get(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?;
        let value = declaration.kind().deserialize(token)?;
        let applied = self.engine.set(key, &value)?;
        self.refresh();
        Ok(applied)
    }

    pub fn set_override(&mut self, enabled: bool) -> Result<&Schema> {
        self.engine.set_override_enabled(enabled)?;
        self.refresh();
        Ok(&self.schema)
    }

    /// Clear all local overrides. Returns how many were removed.
    pub fn reset_all(&mut self) -> Result<usize> {
        let removed = self.engine.reset()?;
        self.refresh();
        Ok(removed)
    }

    fn refresh(&mut self) {
        self.schema = project_engine(&self.engine);
    }
}
