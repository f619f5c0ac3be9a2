//! KDL manifest declaring a project's knobs.
//!
//! # KDL Schema
//!
//! ```kdl
//! knob "api.timeout" kind="int" default=30 name="API timeout"
//! knob "feature.new-ui" kind="bool" default=#false group="Features" sort=1
//! knob "theme" kind="enum" default="dark" group="Appearance" sort=2 {
//!     case "dark" label="Dark"
//!     case "light" label="Light"
//! }
//! knob "retries" kind="enum" default=3 {
//!     case 1
//!     case 3 label="Three"
//! }
//! knob "regions" kind="list" of="string" default="eu,us"
//! knob "endpoint" kind="url" default="https://api.example.com/"
//! knob "limits" kind="json" default="{\"max\":10}"
//! ```
//!
//! Knobs are registered in file order. `default` may be a string token or a
//! bare KDL number/boolean. For `kind="enum"` (or `of="enum"`) the `case`
//! children give the ordered case list; the KDL type of each case argument
//! (integer, float, string) selects its raw value type.

use crate::spec::{Declaration, Group, Spec};
use crate::value::{EnumCase, EnumSpec, RawValue, ValueKind};
use crate::{Error, Result};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::path::Path;

/// Default manifest file name inside a project directory.
pub const MANIFEST_FILE: &str = "knobs.kdl";

/// Build a spec from a manifest document.
pub fn parse_manifest(doc: &KdlDocument) -> Result<Spec> {
    let mut spec = Spec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "knob" => spec.add(parse_knob_node(node)?)?,
            other => {
                tracing::debug!("ignoring unknown manifest node {:?}", other);
            }
        }
    }

    Ok(spec)
}

/// Load a manifest file. A missing file declares no knobs.
pub fn load_manifest(path: &Path) -> Result<Spec> {
    if !path.exists() {
        tracing::debug!("no manifest at {}", path.display());
        return Ok(Spec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Manifest(format!("Failed to read {}: {}", path.display(), e)))?;

    let doc: KdlDocument = content.parse().map_err(|e| {
        Error::Manifest(format!("Failed to parse KDL in {}: {}", path.display(), e))
    })?;

    parse_manifest(&doc).map_err(|e| match e {
        Error::Manifest(msg) => Error::Manifest(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn parse_knob_node(node: &KdlNode) -> Result<Declaration> {
    let key = get_string_arg(node)
        .ok_or_else(|| Error::Manifest("knob node must have a key argument".to_string()))?;

    let kind_name = get_prop(node, "kind")
        .and_then(KdlValue::as_string)
        .ok_or_else(|| Error::Manifest(format!("knob {}: missing kind", key)))?;
    let kind = parse_kind(&key, node, kind_name)?;

    let default_token = get_prop(node, "default")
        .and_then(token_of)
        .ok_or_else(|| Error::Manifest(format!("knob {}: missing default", key)))?;
    let default = kind
        .deserialize(&default_token)
        .map_err(|e| Error::Manifest(format!("knob {}: invalid default: {}", key, e)))?;

    let mut declaration = Declaration::new(key.clone(), kind, default)?;

    if let Some(name) = get_prop(node, "name").and_then(KdlValue::as_string) {
        declaration = declaration.with_display_name(name);
    }

    if let Some(group) = get_prop(node, "group").and_then(KdlValue::as_string) {
        let sort_order = match get_prop(node, "sort") {
            None => 0,
            Some(value) => value
                .as_integer()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| Error::Manifest(format!("knob {}: sort must be an integer", key)))?,
        };
        declaration = declaration.in_group(Group::named(group, sort_order));
    }

    Ok(declaration)
}

fn parse_kind(key: &str, node: &KdlNode, name: &str) -> Result<ValueKind> {
    match name {
        "enum" => Ok(ValueKind::Enum(parse_cases(key, node)?)),
        "list" => {
            let element = get_prop(node, "of")
                .and_then(KdlValue::as_string)
                .ok_or_else(|| Error::Manifest(format!("knob {}: list needs of=", key)))?;
            if element == "list" {
                return Err(Error::Manifest(format!(
                    "knob {}: nested lists are not supported",
                    key
                )));
            }
            Ok(ValueKind::List(Box::new(parse_kind(key, node, element)?)))
        }
        other => ValueKind::parse_scalar(other)
            .ok_or_else(|| Error::Manifest(format!("knob {}: unknown kind {:?}", key, other))),
    }
}

fn parse_cases(key: &str, node: &KdlNode) -> Result<EnumSpec> {
    let mut cases = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() != "case" {
                continue;
            }
            let raw = child
                .entries()
                .iter()
                .find(|e| e.name().is_none())
                .and_then(|e| raw_of(e.value()))
                .ok_or_else(|| {
                    Error::Manifest(format!("knob {}: case needs a raw value", key))
                })?;
            let mut case = EnumCase::new(raw);
            if let Some(label) = get_prop(child, "label").and_then(KdlValue::as_string) {
                case = case.with_label(label);
            }
            cases.push(case);
        }
    }

    if cases.is_empty() {
        return Err(Error::Manifest(format!("knob {}: enum has no cases", key)));
    }
    Ok(EnumSpec::new(cases))
}

fn raw_of(value: &KdlValue) -> Option<RawValue> {
    match value {
        KdlValue::Integer(i) => i64::try_from(*i).ok().map(RawValue::Int),
        KdlValue::Float(x) => Some(RawValue::Float(*x)),
        KdlValue::String(s) => Some(RawValue::Str(s.clone())),
        _ => None,
    }
}

/// Token text of a KDL scalar.
fn token_of(value: &KdlValue) -> Option<String> {
    match value {
        KdlValue::String(s) => Some(s.clone()),
        KdlValue::Integer(i) => Some(i.to_string()),
        KdlValue::Float(x) => Some(x.to_string()),
        KdlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Get a string argument from a node's first entry.
fn get_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .filter(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Get a named property value.
fn get_prop<'a>(node: &'a KdlNode, name: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .rev()
        .find(|e| e.name().is_some_and(|n| n.value() == name))
        .map(|e| e.value())
}
