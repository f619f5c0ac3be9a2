//! Knob declarations and the ordered spec that holds them.
//!
//! A [`Spec`] is built by explicit registration, one call per knob:
//!
//! ```
//! use knobs::spec::{Group, Spec};
//!
//! let mut spec = Spec::new();
//! let timeout = spec.register("api.timeout", 30i64, Group::default()).unwrap();
//! let new_ui = spec
//!     .register("feature.new-ui", false, Group::named("Features", 1))
//!     .unwrap();
//! assert_eq!(spec.len(), 2);
//! assert_eq!(timeout.key(), "api.timeout");
//! assert_eq!(new_ui.key(), "feature.new-ui");
//! ```
//!
//! Registration order is declaration order, and it is preserved all the way
//! into the projected display schema.

use crate::engine::{Engine, OVERRIDE_ENABLED_KEY, ValueWithPermission};
use crate::value::{ConfigValue, Value, ValueKind};
use crate::{Error, Result};
use serde::Serialize;
use std::marker::PhantomData;

/// Display group of a knob.
///
/// The default group has no name; its knobs are shown ahead of every named
/// group. Named groups are ordered by `sort_order`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Group {
    pub name: Option<String>,
    pub sort_order: i32,
}

impl Group {
    pub fn named(name: impl Into<String>, sort_order: i32) -> Self {
        Self {
            name: Some(name.into()),
            sort_order,
        }
    }

    pub fn is_default(&self) -> bool {
        self.name.is_none()
    }
}

/// One declared knob: key, kind, default and display placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    key: String,
    display_name: Option<String>,
    kind: ValueKind,
    default: Value,
    group: Group,
}

impl Declaration {
    /// Create a declaration in the default group.
    ///
    /// The default must survive a serialize/deserialize round trip under
    /// `kind`, so that resolution can always fall back to it.
    pub fn new(key: impl Into<String>, kind: ValueKind, default: Value) -> Result<Self> {
        let key = key.into();
        let token = default.serialize();
        match kind.deserialize(&token) {
            Ok(parsed) if parsed == default => {}
            Ok(parsed) => {
                return Err(Error::InvalidDefault {
                    key,
                    reason: format!("{:?} reads back as {:?}", token, parsed.serialize()),
                });
            }
            Err(e) => {
                return Err(Error::InvalidDefault {
                    key,
                    reason: e.to_string(),
                });
            }
        }
        Ok(Self {
            key,
            display_name: None,
            kind,
            default,
            group: Group::default(),
        })
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn in_group(mut self, group: Group) -> Self {
        self.group = group;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Display name, or the key when none was given.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.key)
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Resolve this knob now. Never cached.
    pub fn resolve(&self, engine: &Engine) -> ValueWithPermission<Value> {
        engine.get(&self.key, &self.kind, &self.default)
    }

    pub fn current_value(&self, engine: &Engine) -> Value {
        self.resolve(engine).value
    }

    pub fn is_readonly(&self, engine: &Engine) -> bool {
        self.resolve(engine).readonly
    }
}

/// Typed handle returned by [`Spec::register`].
#[derive(Debug, Clone)]
pub struct Knob<T> {
    key: String,
    default: T,
    _kind: PhantomData<fn() -> T>,
}

impl<T: ConfigValue + Clone> Knob<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn get(&self, engine: &Engine) -> ValueWithPermission<T> {
        engine.get_typed(&self.key, self.default.clone())
    }

    /// Store an override. Returns `false` when override mode is off.
    pub fn set(&self, engine: &Engine, value: &T) -> Result<bool> {
        engine.set(&self.key, &value.to_value())
    }
}

/// Ordered set of declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spec {
    declarations: Vec<Declaration>,
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a typed knob in `group`.
    pub fn register<T: ConfigValue + Clone>(
        &mut self,
        key: impl Into<String>,
        default: T,
        group: Group,
    ) -> Result<Knob<T>> {
        self.register_named(key, None::<String>, default, group)
    }

    /// Declare a typed knob with an optional display name.
    pub fn register_named<T: ConfigValue + Clone>(
        &mut self,
        key: impl Into<String>,
        display_name: Option<impl Into<String>>,
        default: T,
        group: Group,
    ) -> Result<Knob<T>> {
        let key = key.into();
        let mut declaration = Declaration::new(key.clone(), T::kind(), default.to_value())?
            .in_group(group);
        if let Some(name) = display_name {
            declaration = declaration.with_display_name(name);
        }
        self.add(declaration)?;
        Ok(Knob {
            key,
            default,
            _kind: PhantomData,
        })
    }

    /// Append a prepared declaration. Keys must be unique.
    pub fn add(&mut self, declaration: Declaration) -> Result<()> {
        if declaration.key() == OVERRIDE_ENABLED_KEY {
            return Err(Error::ReservedKey(declaration.key().to_string()));
        }
        if self.get(declaration.key()).is_some() {
            return Err(Error::DuplicateKey(declaration.key().to_string()));
        }
        self.declarations.push(declaration);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.key() == key)
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(Declaration::key)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
