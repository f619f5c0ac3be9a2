//! Bridges between Rust types and knob values.

use super::{Value, ValueKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// A Rust type that can be stored in a knob.
pub trait ConfigValue: Sized {
    /// Kind used to parse tokens for this type.
    fn kind() -> ValueKind;

    fn to_value(&self) -> Value;

    /// Convert back from a value of [`Self::kind`]. Returns `None` when the
    /// value has a different shape.
    fn from_value(value: Value) -> Option<Self>;
}

impl ConfigValue for bool {
    fn kind() -> ValueKind {
        ValueKind::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl ConfigValue for i64 {
    fn kind() -> ValueKind {
        ValueKind::Int
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int()
    }
}

impl ConfigValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(x),
            _ => None,
        }
    }
}

impl ConfigValue for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl ConfigValue for Url {
    fn kind() -> ValueKind {
        ValueKind::Url
    }

    fn to_value(&self) -> Value {
        Value::Url(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Url(u) => Some(u),
            _ => None,
        }
    }
}

impl<T: ConfigValue> ConfigValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ConfigValue::to_value).collect())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// A serde record stored as a JSON document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> ConfigValue for Json<T> {
    fn kind() -> ValueKind {
        ValueKind::Json
    }

    fn to_value(&self) -> Value {
        match serde_json::to_value(&self.0) {
            Ok(doc) => Value::Json(doc),
            Err(e) => {
                tracing::warn!("record is not representable as JSON: {}", e);
                Value::Json(serde_json::Value::Null)
            }
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Json(doc) => serde_json::from_value(doc).ok().map(Json),
            _ => None,
        }
    }
}
