//! Closed case sets (enumerations) backed by int, float or string raw values.

use super::{Value, ValueKind};
use std::fmt;
use std::sync::Arc;

/// The raw value backing an enum case.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(i) => write!(f, "{}", i),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Str(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Str(value)
    }
}

/// One case of an enum knob.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumCase {
    pub raw: RawValue,
    /// Human-readable label; the raw text is shown when absent
    pub label: Option<String>,
}

impl EnumCase {
    pub fn new(raw: impl Into<RawValue>) -> Self {
        Self {
            raw: raw.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_text(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.raw.to_string())
    }
}

/// Ordered list of cases. Cloning shares the case list.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSpec {
    cases: Arc<[EnumCase]>,
}

impl EnumSpec {
    pub fn new(cases: Vec<EnumCase>) -> Self {
        Self {
            cases: cases.into(),
        }
    }

    pub fn cases(&self) -> &[EnumCase] {
        &self.cases
    }

    /// Find the case matching `token`.
    ///
    /// Matching is attempted as an integer first, then as a float, then as a
    /// string, and the first case matching in the earliest stage wins. A token
    /// such as `"2"` therefore selects a case with raw value `Int(2)` even when
    /// a case with raw value `Str("2")` comes earlier in the list.
    pub fn resolve(&self, token: &str) -> Option<usize> {
        if let Ok(n) = token.parse::<i64>() {
            let found = self.position(|raw| matches!(raw, RawValue::Int(v) if *v == n));
            if found.is_some() {
                return found;
            }
        }
        if let Ok(x) = token.parse::<f64>() {
            let found = self.position(|raw| matches!(raw, RawValue::Float(v) if *v == x));
            if found.is_some() {
                return found;
            }
        }
        self.position(|raw| matches!(raw, RawValue::Str(s) if s == token))
    }

    /// Index of the case with exactly this raw value.
    pub fn index_of(&self, raw: &RawValue) -> Option<usize> {
        self.position(|candidate| candidate == raw)
    }

    /// `(display text, raw token)` for every case, in order.
    pub fn choices(&self) -> Vec<(String, String)> {
        self.cases
            .iter()
            .map(|case| (case.display_text(), case.raw.to_string()))
            .collect()
    }

    fn position(&self, predicate: impl Fn(&RawValue) -> bool) -> Option<usize> {
        self.cases.iter().position(|case| predicate(&case.raw))
    }
}

/// A selected case of an [`EnumSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    spec: EnumSpec,
    index: usize,
}

impl EnumValue {
    /// `index` must come from a lookup in `spec`.
    pub(crate) fn new(spec: EnumSpec, index: usize) -> Self {
        Self { spec, index }
    }

    pub fn spec(&self) -> &EnumSpec {
        &self.spec
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn case(&self) -> &EnumCase {
        &self.spec.cases()[self.index]
    }

    pub fn raw(&self) -> &RawValue {
        &self.case().raw
    }

    pub fn display_text(&self) -> String {
        self.case().display_text()
    }
}

/// A Rust enum usable as a knob.
///
/// Implement this and invoke [`config_enum!`](crate::config_enum) to get a
/// [`ConfigValue`](crate::value::ConfigValue) implementation.
pub trait ConfigEnum: Sized {
    /// Every case, in display order.
    fn all() -> Vec<Self>;

    fn raw_value(&self) -> RawValue;

    fn label(&self) -> Option<String> {
        None
    }
}

/// Case list of a [`ConfigEnum`] type.
pub fn spec_of<E: ConfigEnum>() -> EnumSpec {
    EnumSpec::new(
        E::all()
            .iter()
            .map(|case| EnumCase {
                raw: case.raw_value(),
                label: case.label(),
            })
            .collect(),
    )
}

/// Value form of an enum case. A case missing from [`ConfigEnum::all`]
/// degrades to a string holding its raw text.
pub fn value_of<E: ConfigEnum>(case: &E) -> Value {
    let spec = spec_of::<E>();
    let raw = case.raw_value();
    match spec.index_of(&raw) {
        Some(index) => Value::Enum(EnumValue::new(spec, index)),
        None => Value::String(raw.to_string()),
    }
}

/// Typed case for an enum value, matched by raw value.
pub fn case_of<E: ConfigEnum>(value: &Value) -> Option<E> {
    let raw = value.as_enum()?.raw().clone();
    E::all().into_iter().find(|case| case.raw_value() == raw)
}

/// Kind of a [`ConfigEnum`] type.
pub fn kind_of<E: ConfigEnum>() -> ValueKind {
    ValueKind::Enum(spec_of::<E>())
}

/// Implement [`ConfigValue`](crate::value::ConfigValue) for a type
/// implementing [`ConfigEnum`].
#[macro_export]
macro_rules! config_enum {
    ($ty:ty) => {
        impl $crate::value::ConfigValue for $ty {
            fn kind() -> $crate::value::ValueKind {
                $crate::value::enumeration::kind_of::<$ty>()
            }

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::enumeration::value_of(self)
            }

            fn from_value(value: $crate::value::Value) -> Option<Self> {
                $crate::value::enumeration::case_of(&value)
            }
        }
    };
}
