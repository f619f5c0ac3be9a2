//! Resolution engine: the single authority on a knob's current value.
//!
//! ## Precedence (highest to lowest)
//!
//! While override mode is on ([`OverrideMode::Overriding`]):
//! 1. Local override from the [`Store`]
//! 2. Remote value from the [`Provider`]
//! 3. Declared default
//!
//! While override mode is off ([`OverrideMode::Locked`]) the store is ignored
//! and every value is reported read-only.
//!
//! A token that does not parse as the knob's kind is treated as absent and
//! resolution falls through to the next source. Defaults always parse, so
//! resolution itself never fails.
//!
//! ## Override mode
//!
//! The mode is persisted in the store under [`OVERRIDE_ENABLED_KEY`] and is
//! re-read on every operation. It only changes through
//! [`Engine::set_override_enabled`].

use crate::spec::{Declaration, Spec};
use crate::store::{Provider, Store};
use crate::value::{ConfigValue, Value, ValueKind};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Reserved store key holding the override flag.
pub const OVERRIDE_ENABLED_KEY: &str = "knobs.override-enabled";

/// Whether local overrides are in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    /// Remote and default values only; nothing is editable
    #[default]
    Locked,
    /// Local overrides win and values are editable
    Overriding,
}

impl OverrideMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            OverrideMode::Overriding
        } else {
            OverrideMode::Locked
        }
    }

    pub fn is_overriding(&self) -> bool {
        matches!(self, OverrideMode::Overriding)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideMode::Locked => "locked",
            OverrideMode::Overriding => "overriding",
        }
    }
}

impl std::fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Local override from the store
    Override,
    /// Remote value from the provider
    Remote,
    /// Declared default
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Override => write!(f, "override"),
            ValueSource::Remote => write!(f, "remote"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value, whether it may be edited, and its source.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueWithPermission<T> {
    pub value: T,
    pub readonly: bool,
    pub source: ValueSource,
}

impl<T> ValueWithPermission<T> {
    pub fn new(value: T, readonly: bool, source: ValueSource) -> Self {
        Self {
            value,
            readonly,
            source,
        }
    }
}

/// A declaration paired with its current resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDeclaration {
    pub declaration: Declaration,
    pub resolution: ValueWithPermission<Value>,
}

struct Sources {
    store: Box<dyn Store>,
    provider: Box<dyn Provider>,
}

impl Sources {
    fn mode(&self) -> OverrideMode {
        let enabled = self
            .store
            .get(OVERRIDE_ENABLED_KEY)
            .and_then(|token| ValueKind::Bool.deserialize(&token).ok())
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        OverrideMode::from_enabled(enabled)
    }

    fn resolve(
        &self,
        mode: OverrideMode,
        key: &str,
        kind: &ValueKind,
        default: &Value,
    ) -> ValueWithPermission<Value> {
        self.resolve_as(mode, key, kind, default.clone(), Some)
    }

    /// Walk the sources in precedence order, keeping the first token that
    /// parses as `kind` and converts into `T`.
    fn resolve_as<T>(
        &self,
        mode: OverrideMode,
        key: &str,
        kind: &ValueKind,
        default: T,
        convert: impl Fn(Value) -> Option<T>,
    ) -> ValueWithPermission<T> {
        let readonly = !mode.is_overriding();

        if mode.is_overriding() {
            let token = self.store.get(key);
            if let Some(value) = accept(token, key, kind, ValueSource::Override, &convert) {
                return ValueWithPermission::new(value, readonly, ValueSource::Override);
            }
        }

        let token = self.provider.get(key);
        if let Some(value) = accept(token, key, kind, ValueSource::Remote, &convert) {
            return ValueWithPermission::new(value, readonly, ValueSource::Remote);
        }

        ValueWithPermission::new(default, readonly, ValueSource::Default)
    }
}

fn accept<T>(
    token: Option<String>,
    key: &str,
    kind: &ValueKind,
    source: ValueSource,
    convert: impl Fn(Value) -> Option<T>,
) -> Option<T> {
    let token = token?;
    let value = match kind.deserialize(&token) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("ignoring {} value for {}: {}", source, key, e);
            return None;
        }
    };
    let converted = convert(value);
    if converted.is_none() {
        tracing::warn!("ignoring {} value for {}: unexpected shape", source, key);
    }
    converted
}

/// Resolves knob values against a store, a provider and a spec.
///
/// All state sits behind one lock, so deciding the mode and writing to the
/// store happen atomically.
pub struct Engine {
    sources: Mutex<Sources>,
    spec: Spec,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources = self.lock();
        f.debug_struct("Engine")
            .field("store", &sources.store.location())
            .field("provider", &sources.provider.location())
            .field("knobs", &self.spec.len())
            .finish()
    }
}

impl Engine {
    pub fn new(
        store: impl Store + 'static,
        provider: impl Provider + 'static,
        spec: Spec,
    ) -> Self {
        Self {
            sources: Mutex::new(Sources {
                store: Box::new(store),
                provider: Box::new(provider),
            }),
            spec,
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sources> {
        self.sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn override_mode(&self) -> OverrideMode {
        self.lock().mode()
    }

    pub fn is_override_enabled(&self) -> bool {
        self.override_mode().is_overriding()
    }

    /// Switch override mode. Takes effect for the next call.
    pub fn set_override_enabled(&self, enabled: bool) -> Result<()> {
        let mut sources = self.lock();
        sources
            .store
            .set(OVERRIDE_ENABLED_KEY, &Value::Bool(enabled).serialize())?;
        tracing::info!("override mode {}", OverrideMode::from_enabled(enabled));
        Ok(())
    }

    /// Resolve `key` as `kind`, falling back to `default`.
    pub fn get(&self, key: &str, kind: &ValueKind, default: &Value) -> ValueWithPermission<Value> {
        let sources = self.lock();
        let mode = sources.mode();
        sources.resolve(mode, key, kind, default)
    }

    /// Typed variant of [`Engine::get`].
    ///
    /// Each source's token must convert into `T`; one that parses as the kind
    /// but has the wrong shape falls through like any malformed token.
    pub fn get_typed<T: ConfigValue>(&self, key: &str, default: T) -> ValueWithPermission<T> {
        let sources = self.lock();
        let mode = sources.mode();
        sources.resolve_as(mode, key, &T::kind(), default, T::from_value)
    }

    /// Write a local override.
    ///
    /// Returns `Ok(false)` without touching the store while override mode is
    /// off. The override flag itself is rejected; use
    /// [`Engine::set_override_enabled`].
    pub fn set(&self, key: &str, value: &Value) -> Result<bool> {
        if key == OVERRIDE_ENABLED_KEY {
            return Err(Error::ReservedKey(key.to_string()));
        }
        let mut sources = self.lock();
        if !sources.mode().is_overriding() {
            tracing::debug!("override mode is off, ignoring set of {}", key);
            return Ok(false);
        }
        sources.store.set(key, &value.serialize())?;
        tracing::debug!("override {} = {}", key, value);
        Ok(true)
    }

    /// Raw override token currently stored for `key`, regardless of mode.
    pub fn stored_override(&self, key: &str) -> Option<String> {
        self.lock().store.get(key)
    }

    /// Declarations available for editing. Empty while override mode is off.
    pub fn list_declarations(&self) -> Vec<Declaration> {
        if !self.is_override_enabled() {
            return Vec::new();
        }
        self.spec.declarations().to_vec()
    }

    /// Remove every declared key from the store. Returns how many overrides
    /// were removed; a no-op while override mode is off.
    pub fn reset(&self) -> Result<usize> {
        let mut sources = self.lock();
        if !sources.mode().is_overriding() {
            tracing::debug!("override mode is off, ignoring reset");
            return Ok(0);
        }

        let mut removed = 0;
        for key in self.spec.keys() {
            if sources.store.remove(key)? {
                removed += 1;
            }
        }
        tracing::info!("reset {} overrides", removed);
        Ok(removed)
    }

    /// Current mode plus every listed declaration with its resolution,
    /// computed under a single lock.
    pub fn resolve_all(&self) -> (OverrideMode, Vec<ResolvedDeclaration>) {
        let sources = self.lock();
        let mode = sources.mode();
        if !mode.is_overriding() {
            return (mode, Vec::new());
        }

        let resolved = self
            .spec
            .declarations()
            .iter()
            .map(|declaration| ResolvedDeclaration {
                resolution: sources.resolve(
                    mode,
                    declaration.key(),
                    declaration.kind(),
                    declaration.default_value(),
                ),
                declaration: declaration.clone(),
            })
            .collect();
        (mode, resolved)
    }

    /// Re-read the store and the provider from their backing files.
    pub fn reload(&self) -> Result<()> {
        let mut sources = self.lock();
        sources.store.reload()?;
        sources.provider.reload()?;
        Ok(())
    }

    pub fn store_location(&self) -> String {
        self.lock().store.location()
    }

    pub fn provider_location(&self) -> String {
        self.lock().provider.location()
    }

    /// When the provider's remote values were fetched, if it knows.
    pub fn remote_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.lock().provider.fetched_at()
    }
}

/// Assembles an [`Engine`]; every collaborator is required.
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Box<dyn Store>>,
    provider: Option<Box<dyn Provider>>,
    spec: Option<Spec>,
}

impl EngineBuilder {
    pub fn store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn spec(mut self, spec: Spec) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let store = self.store.ok_or(Error::NotConfigured("store"))?;
        let provider = self.provider.ok_or(Error::NotConfigured("provider"))?;
        let spec = self.spec.ok_or(Error::NotConfigured("spec"))?;
        Ok(Engine {
            sources: Mutex::new(Sources { store, provider }),
            spec,
        })
    }
}
