//! Projection of resolved knobs into a grouped display schema.
//!
//! The projection is a pure function of the override mode and the resolved
//! declarations. Its output is:
//!
//! 1. An [`SectionId::Overrides`] section holding the override toggle, the
//!    reset action (only while overriding) and every knob of the default
//!    group, in declaration order.
//! 2. One [`SectionId::Group`] section per named group, ordered by
//!    `sort_order`. Groups with equal `sort_order` keep the order in which
//!    they were first declared.
//!
//! Each knob becomes a toggle (bool), a choice (enum) or a text item
//! (everything else).

use crate::engine::{Engine, OverrideMode, ResolvedDeclaration, ValueWithPermission};
use crate::spec::{Declaration, Group};
use crate::value::Value;
use serde::Serialize;

/// Identity of a display section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionId {
    /// The ungrouped leading section
    Overrides,
    /// A named group
    Group { name: String, sort_order: i32 },
}

impl SectionId {
    pub fn title(&self) -> Option<&str> {
        match self {
            SectionId::Overrides => None,
            SectionId::Group { name, .. } => Some(name),
        }
    }
}

/// One option of a choice item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub display_text: String,
    pub raw_token: String,
}

/// A display item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    /// Switch for override mode
    OverrideToggle { enabled: bool },
    /// Clear all local overrides
    ResetAction,
    /// Boolean knob
    Toggle {
        key: String,
        title: String,
        value: bool,
        readonly: bool,
    },
    /// Enum knob
    Choice {
        key: String,
        title: String,
        current_text: String,
        current_token: String,
        choices: Vec<Choice>,
        readonly: bool,
    },
    /// Any other knob, shown as its serialized token
    Text {
        key: String,
        title: String,
        value: String,
        readonly: bool,
    },
}

impl Item {
    /// Knob key, for knob items.
    pub fn key(&self) -> Option<&str> {
        match self {
            Item::OverrideToggle { .. } | Item::ResetAction => None,
            Item::Toggle { key, .. } | Item::Choice { key, .. } | Item::Text { key, .. } => {
                Some(key)
            }
        }
    }
}

/// A section and its ordered items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: SectionId,
    pub items: Vec<Item>,
}

/// The full display model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub sections: Vec<Section>,
}

impl Schema {
    /// Find the item for a knob key.
    pub fn item(&self, key: &str) -> Option<&Item> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .find(|item| item.key() == Some(key))
    }

    /// Knob keys in display order.
    pub fn keys(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .filter_map(Item::key)
            .collect()
    }
}

/// Turn one resolved knob into its display item.
pub fn classify(declaration: &Declaration, resolution: &ValueWithPermission<Value>) -> Item {
    let key = declaration.key().to_string();
    let title = declaration.title().to_string();
    let readonly = resolution.readonly;

    match &resolution.value {
        Value::Bool(value) => Item::Toggle {
            key,
            title,
            value: *value,
            readonly,
        },
        Value::Enum(selected) => Item::Choice {
            key,
            title,
            current_text: selected.display_text(),
            current_token: selected.raw().to_string(),
            choices: selected
                .spec()
                .choices()
                .into_iter()
                .map(|(display_text, raw_token)| Choice {
                    display_text,
                    raw_token,
                })
                .collect(),
            readonly,
        },
        other => Item::Text {
            key,
            title,
            value: other.serialize(),
            readonly,
        },
    }
}

/// Build the display schema.
pub fn project(mode: OverrideMode, entries: &[ResolvedDeclaration]) -> Schema {
    let mut head = vec![Item::OverrideToggle {
        enabled: mode.is_overriding(),
    }];
    if mode.is_overriding() {
        head.push(Item::ResetAction);
    }

    let mut groups: Vec<(Group, Vec<Item>)> = Vec::new();
    for entry in entries {
        let item = classify(&entry.declaration, &entry.resolution);
        let group = entry.declaration.group();
        if group.is_default() {
            head.push(item);
            continue;
        }
        match groups.iter_mut().find(|(existing, _)| existing == group) {
            Some((_, items)) => items.push(item),
            None => groups.push((group.clone(), vec![item])),
        }
    }

    // Stable: equal sort orders keep first-declared order.
    groups.sort_by_key(|(group, _)| group.sort_order);

    let mut sections = vec![Section {
        id: SectionId::Overrides,
        items: head,
    }];
    sections.extend(groups.into_iter().map(|(group, items)| Section {
        id: SectionId::Group {
            name: group.name.unwrap_or_default(),
            sort_order: group.sort_order,
        },
        items,
    }));

    Schema { sections }
}

/// Project the engine's current state.
pub fn project_engine(engine: &Engine) -> Schema {
    let (mode, entries) = engine.resolve_all();
    project(mode, &entries)
}
