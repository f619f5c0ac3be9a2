//! String serialization for knob values.
//!
//! Every knob value is stored and transmitted as a single string token. This
//! module defines the closed set of supported value kinds and the rules each
//! kind uses to turn a [`Value`] into a token and back:
//!
//! | Kind     | Serialized form                     | Parse failure          |
//! |----------|-------------------------------------|------------------------|
//! | `bool`   | `true` / `false`                    | never (`1`/`true` only)|
//! | `int`    | decimal `i64`                       | non-numeric token      |
//! | `float`  | shortest round-trip `f64`           | non-numeric token      |
//! | `string` | identity                            | never                  |
//! | `url`    | absolute URL text                   | unparsable URL         |
//! | `enum`   | raw value text of the case          | no matching case       |
//! | `json`   | one JSON document                   | invalid JSON           |
//! | `list`   | element tokens joined with `,`      | never (bad items drop) |

pub mod enumeration;
pub mod typed;

pub use enumeration::{ConfigEnum, EnumCase, EnumSpec, EnumValue, RawValue};
pub use typed::{ConfigValue, Json};

use std::fmt;
use url::Url;

/// Separator between element tokens of a list value.
pub const LIST_SEPARATOR: char = ',';

/// A token could not be parsed as the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value {token:?}: {reason}")]
pub struct FormatError {
    /// Name of the kind the token was parsed as
    pub kind: String,
    /// The offending token
    pub token: String,
    /// Parser message
    pub reason: String,
}

impl FormatError {
    fn new(kind: &ValueKind, token: &str, reason: impl fmt::Display) -> Self {
        Self {
            kind: kind.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The kind of a knob, selecting its serialization rules.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    Url,
    /// Closed set of cases with int, float or string raw values
    Enum(EnumSpec),
    /// Structured record carried as a JSON document
    Json,
    /// Homogeneous list of the element kind
    List(Box<ValueKind>),
}

impl ValueKind {
    /// Short name used in manifests and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Url => "url",
            ValueKind::Enum(_) => "enum",
            ValueKind::Json => "json",
            ValueKind::List(_) => "list",
        }
    }

    /// Parse a scalar kind name. `enum` and `list` need extra data and are
    /// built by the caller.
    pub fn parse_scalar(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(ValueKind::Bool),
            "int" => Some(ValueKind::Int),
            "float" => Some(ValueKind::Float),
            "string" => Some(ValueKind::String),
            "url" => Some(ValueKind::Url),
            "json" => Some(ValueKind::Json),
            _ => None,
        }
    }

    /// Parse a token as a value of this kind.
    pub fn deserialize(&self, token: &str) -> Result<Value, FormatError> {
        match self {
            ValueKind::Bool => Ok(Value::Bool(token == "1" || token == "true")),
            ValueKind::Int => token
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| FormatError::new(self, token, e)),
            ValueKind::Float => token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| FormatError::new(self, token, e)),
            ValueKind::String => Ok(Value::String(token.to_string())),
            ValueKind::Url => Url::parse(token)
                .map(Value::Url)
                .map_err(|e| FormatError::new(self, token, e)),
            ValueKind::Enum(spec) => spec
                .resolve(token)
                .map(|index| Value::Enum(EnumValue::new(spec.clone(), index)))
                .ok_or_else(|| FormatError::new(self, token, "no matching case")),
            ValueKind::Json => serde_json::from_str(token)
                .map(Value::Json)
                .map_err(|e| FormatError::new(self, token, e)),
            ValueKind::List(element) => Ok(Value::List(deserialize_list(element, token))),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::List(element) => write!(f, "list<{}>", element),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Split a list token and parse every segment, dropping the ones that fail.
fn deserialize_list(element: &ValueKind, token: &str) -> Vec<Value> {
    token
        .split(LIST_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| match element.deserialize(segment) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("dropping list element: {}", e);
                None
            }
        })
        .collect()
}

/// A knob value of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Url(Url),
    Enum(EnumValue),
    Json(serde_json::Value),
    List(Vec<Value>),
}

impl Value {
    /// Render the value as its single string token. Never fails.
    pub fn serialize(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::String(s) => s.clone(),
            Value::Url(u) => u.as_str().to_string(),
            Value::Enum(e) => e.raw().to_string(),
            Value::Json(j) => j.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::serialize)
                .collect::<Vec<_>>()
                .join(&LIST_SEPARATOR.to_string()),
        }
    }

    /// Text shown to a human: the case label for enums, the token otherwise.
    pub fn display_text(&self) -> String {
        match self {
            Value::Enum(e) => e.display_text(),
            other => other.serialize(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Enum payload, if this value belongs to a closed case set.
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

/// Serialize a typed value to its token.
pub fn serialize<T: ConfigValue>(value: &T) -> String {
    value.to_value().serialize()
}

/// Parse a token into a typed value.
pub fn deserialize<T: ConfigValue>(token: &str) -> Result<T, FormatError> {
    let kind = T::kind();
    let value = kind.deserialize(token)?;
    T::from_value(value).ok_or_else(|| FormatError::new(&kind, token, "type mismatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Bool Tests ====================

    #[test]
    fn test_bool_serialize() {
        assert_eq!(Value::Bool(true).serialize(), "true");
        assert_eq!(Value::Bool(false).serialize(), "false");
    }

    #[test]
    fn test_bool_deserialize_is_total() {
        let kind = ValueKind::Bool;
        assert_eq!(kind.deserialize("true").unwrap(), Value::Bool(true));
        assert_eq!(kind.deserialize("1").unwrap(), Value::Bool(true));
        assert_eq!(kind.deserialize("TRUE").unwrap(), Value::Bool(false));
        assert_eq!(kind.deserialize("yes").unwrap(), Value::Bool(false));
        assert_eq!(kind.deserialize("").unwrap(), Value::Bool(false));
    }

    // ==================== Number Tests ====================

    #[test]
    fn test_int_round_trip() {
        for n in [0i64, 1, -42, i64::MAX, i64::MIN] {
            let token = Value::Int(n).serialize();
            assert_eq!(ValueKind::Int.deserialize(&token).unwrap(), Value::Int(n));
        }
    }

    #[test]
    fn test_int_rejects_non_numeric() {
        let err = ValueKind::Int.deserialize("five").unwrap_err();
        assert_eq!(err.kind, "int");
        assert_eq!(err.token, "five");
        assert!(ValueKind::Int.deserialize("1.5").is_err());
    }

    #[test]
    fn test_float_round_trip() {
        for x in [0.0f64, 1.5, -0.25, 1e-9, 12345.678] {
            let token = Value::Float(x).serialize();
            assert_eq!(ValueKind::Float.deserialize(&token).unwrap(), Value::Float(x));
        }
        assert_eq!(Value::Float(2.0).serialize(), "2");
    }

    #[test]
    fn test_float_rejects_non_numeric() {
        assert!(ValueKind::Float.deserialize("1,5").is_err());
        assert!(ValueKind::Float.deserialize("abc").is_err());
    }

    // ==================== String and URL Tests ====================

    #[test]
    fn test_string_identity() {
        let token = "hello, world";
        let value = ValueKind::String.deserialize(token).unwrap();
        assert_eq!(value, Value::String(token.to_string()));
        assert_eq!(value.serialize(), token);
    }

    #[test]
    fn test_url_round_trip() {
        let value = ValueKind::Url
            .deserialize("https://api.example.com/v1?x=1")
            .unwrap();
        assert_eq!(value.serialize(), "https://api.example.com/v1?x=1");
        assert_eq!(ValueKind::Url.deserialize(&value.serialize()).unwrap(), value);
    }

    #[test]
    fn test_url_rejects_relative() {
        assert!(ValueKind::Url.deserialize("not a url").is_err());
        assert!(ValueKind::Url.deserialize("/relative/path").is_err());
    }

    // ==================== JSON Tests ====================

    #[test]
    fn test_json_round_trip() {
        let doc = serde_json::json!({"max": 10, "tags": ["a", "b"], "nested": {"on": true}});
        let value = Value::Json(doc.clone());
        let token = value.serialize();
        assert_eq!(ValueKind::Json.deserialize(&token).unwrap(), Value::Json(doc));
    }

    #[test]
    fn test_json_rejects_malformed() {
        assert!(ValueKind::Json.deserialize("{not json").is_err());
    }

    // ==================== List Tests ====================

    #[test]
    fn test_list_serialize_joins_with_comma() {
        let value = Value::List(vec![
            Value::String("apple".to_string()),
            Value::String("banana".to_string()),
        ]);
        assert_eq!(value.serialize(), "apple,banana");
    }

    #[test]
    fn test_list_deserialize() {
        let kind = ValueKind::List(Box::new(ValueKind::String));
        let expected = Value::List(vec![
            Value::String("apple".to_string()),
            Value::String("banana".to_string()),
        ]);
        assert_eq!(kind.deserialize("apple,banana").unwrap(), expected);
        assert_eq!(kind.deserialize("apple,,banana").unwrap(), expected);
    }

    #[test]
    fn test_list_empty_input() {
        let kind = ValueKind::List(Box::new(ValueKind::Int));
        assert_eq!(kind.deserialize("").unwrap(), Value::List(vec![]));
        assert_eq!(Value::List(vec![]).serialize(), "");
    }

    #[test]
    fn test_list_drops_unparsable_elements() {
        let kind = ValueKind::List(Box::new(ValueKind::Int));
        assert_eq!(
            kind.deserialize("1,two,3").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(3)])
        );
    }

    // ==================== Typed Helper Tests ====================

    #[test]
    fn test_typed_round_trip() {
        assert!(deserialize::<bool>(&serialize(&true)).unwrap());
        assert_eq!(deserialize::<i64>(&serialize(&-7i64)).unwrap(), -7);
        assert_eq!(deserialize::<f64>(&serialize(&0.5f64)).unwrap(), 0.5);
        assert_eq!(
            deserialize::<String>(&serialize(&"x".to_string())).unwrap(),
            "x"
        );
        let list = vec![1i64, 2, 3];
        assert_eq!(deserialize::<Vec<i64>>(&serialize(&list)).unwrap(), list);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::Int.to_string(), "int");
        assert_eq!(
            ValueKind::List(Box::new(ValueKind::Url)).to_string(),
            "list<url>"
        );
    }

    #[test]
    fn test_parse_scalar_kind() {
        assert_eq!(ValueKind::parse_scalar("float"), Some(ValueKind::Float));
        assert_eq!(ValueKind::parse_scalar("enum"), None);
        assert_eq!(ValueKind::parse_scalar("list"), None);
    }
}
