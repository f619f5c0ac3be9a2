//! Knob commands: show, list, get, set, override and reset.

use super::{Context, Output, open_session, to_json_string};
use crate::engine::{OverrideMode, ValueSource};
use crate::schema::{Item, Schema, SectionId};
use crate::{Error, Result};
use serde::Serialize;

// === Show ===

#[derive(Debug, Serialize)]
pub struct ShowResult {
    pub mode: OverrideMode,
    pub schema: Schema,
}

impl Output for ShowResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for section in &self.schema.sections {
            match &section.id {
                SectionId::Overrides => lines.push("Overrides".to_string()),
                SectionId::Group { name, .. } => {
                    lines.push(String::new());
                    lines.push(name.clone());
                }
            }
            for item in &section.items {
                lines.push(format!("  {}", human_item(item)));
            }
        }
        if !self.mode.is_overriding() {
            lines.push(String::new());
            lines.push("Override mode is off. Run `knobs override on` to edit.".to_string());
        }
        lines.join("\n")
    }
}

fn human_item(item: &Item) -> String {
    let lock = |readonly: bool| if readonly { " (readonly)" } else { "" };
    match item {
        Item::OverrideToggle { enabled } => {
            format!("[{}] Override mode", if *enabled { "x" } else { " " })
        }
        Item::ResetAction => "Reset all overrides".to_string(),
        Item::Toggle {
            key,
            title,
            value,
            readonly,
        } => format!(
            "[{}] {} ({}){}",
            if *value { "x" } else { " " },
            title,
            key,
            lock(*readonly)
        ),
        Item::Choice {
            key,
            title,
            current_text,
            choices,
            readonly,
            ..
        } => {
            let options: Vec<&str> = choices.iter().map(|c| c.display_text.as_str()).collect();
            format!(
                "{} ({}) = {} [{}]{}",
                title,
                key,
                current_text,
                options.join("|"),
                lock(*readonly)
            )
        }
        Item::Text {
            key,
            title,
            value,
            readonly,
        } => format!("{} ({}) = {}{}", title, key, value, lock(*readonly)),
    }
}

/// Project the current display schema.
pub fn show(ctx: &Context) -> Result<ShowResult> {
    let session = open_session(ctx)?;
    Ok(ShowResult {
        mode: session.mode(),
        schema: session.schema().clone(),
    })
}

// === List ===

#[derive(Debug, Serialize)]
pub struct KnobSummary {
    pub key: String,
    pub title: String,
    pub kind: String,
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub mode: OverrideMode,
    pub count: usize,
    pub knobs: Vec<KnobSummary>,
}

impl Output for ListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if !self.mode.is_overriding() {
            return "No knobs listed: override mode is off.".to_string();
        }
        if self.knobs.is_empty() {
            return "No knobs declared.".to_string();
        }
        let mut lines = vec![format!("{} knob(s):", self.count)];
        for knob in &self.knobs {
            let group = knob
                .group
                .as_deref()
                .map(|g| format!(" [{}]", g))
                .unwrap_or_default();
            lines.push(format!(
                "  {} ({}) default={}{}",
                knob.key, knob.kind, knob.default, group
            ));
        }
        lines.join("\n")
    }
}

/// List declared knobs. Empty while override mode is off.
pub fn list(ctx: &Context) -> Result<ListResult> {
    let session = open_session(ctx)?;
    let knobs: Vec<KnobSummary> = session
        .engine()
        .list_declarations()
        .iter()
        .map(|d| KnobSummary {
            key: d.key().to_string(),
            title: d.title().to_string(),
            kind: d.kind().to_string(),
            default: d.default_value().serialize(),
            group: d.group().name.clone(),
        })
        .collect();
    Ok(ListResult {
        mode: session.mode(),
        count: knobs.len(),
        knobs,
    })
}

// === Get ===

#[derive(Debug, Serialize)]
pub struct GetResult {
    pub key: String,
    pub kind: String,
    pub value: String,
    pub display: String,
    pub readonly: bool,
    pub source: ValueSource,
}

impl Output for GetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut flags = vec![self.source.to_string()];
        if self.readonly {
            flags.push("readonly".to_string());
        }
        format!("{} = {} ({})", self.key, self.display, flags.join(", "))
    }
}

/// Resolve one knob.
pub fn get(ctx: &Context, key: &str) -> Result<GetResult> {
    let session = open_session(ctx)?;
    let engine = session.engine();
    let declaration = engine
        .spec()
        .get(key)
        .ok_or_else(|| Error::UnknownKey(key.to_string()))?;
    let resolved = declaration.resolve(engine);
    Ok(GetResult {
        key: key.to_string(),
        kind: declaration.kind().to_string(),
        value: resolved.value.serialize(),
        display: resolved.value.display_text(),
        readonly: resolved.readonly,
        source: resolved.source,
    })
}

// === Set ===

#[derive(Debug, Serialize)]
pub struct SetResult {
    pub key: String,
    pub value: String,
    pub applied: bool,
}

impl Output for SetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.applied {
            format!("Set {} = {}", self.key, self.value)
        } else {
            format!(
                "Not set: override mode is off. Run `knobs override on` before changing {}.",
                self.key
            )
        }
    }
}

/// Store a local override for one knob.
pub fn set(ctx: &Context, key: &str, token: &str) -> Result<SetResult> {
    let mut session = open_session(ctx)?;
    let applied = session.update_value(key, token)?;
    let value = session
        .engine()
        .stored_override(key)
        .filter(|_| applied)
        .unwrap_or_else(|| token.to_string());
    Ok(SetResult {
        key: key.to_string(),
        value,
        applied,
    })
}

// === Override ===

#[derive(Debug, Serialize)]
pub struct OverrideResult {
    pub mode: OverrideMode,
    pub changed: bool,
}

impl Output for OverrideResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match (self.mode, self.changed) {
            (OverrideMode::Overriding, true) => "Override mode enabled.".to_string(),
            (OverrideMode::Locked, true) => "Override mode disabled.".to_string(),
            (mode, false) => format!("Override mode already {}.", mode),
        }
    }
}

/// Turn override mode on or off.
pub fn override_mode(ctx: &Context, enabled: bool) -> Result<OverrideResult> {
    let mut session = open_session(ctx)?;
    let before = session.mode();
    session.set_override(enabled)?;
    let mode = session.mode();
    Ok(OverrideResult {
        mode,
        changed: before != mode,
    })
}

// === Reset ===

#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub mode: OverrideMode,
    pub removed: usize,
}

impl Output for ResetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if !self.mode.is_overriding() {
            return "Nothing reset: override mode is off.".to_string();
        }
        format!("Removed {} override(s).", self.removed)
    }
}

/// Clear every local override.
pub fn reset(ctx: &Context) -> Result<ResetResult> {
    let mut session = open_session(ctx)?;
    let removed = session.reset_all()?;
    Ok(ResetResult {
        mode: session.mode(),
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, write_remote};
    use super::*;
    use crate::test_utils::TestEnv;

    // ==================== Show Tests ====================

    #[test]
    fn test_show_locked() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let result = show(&ctx).unwrap();
        assert_eq!(result.mode, OverrideMode::Locked);
        assert!(result.schema.keys().is_empty());
        assert!(result.to_human().contains("Override mode is off"));
    }

    #[test]
    fn test_show_overriding_groups_in_sort_order() {
        let env = TestEnv::new();
        let ctx = context(&env);
        override_mode(&ctx, true).unwrap();

        let result = show(&ctx).unwrap();
        let titles: Vec<Option<&str>> = result
            .schema
            .sections
            .iter()
            .map(|s| s.id.title())
            .collect();
        assert_eq!(titles, vec![None, Some("Features"), Some("Appearance")]);

        let human = result.to_human();
        assert!(human.contains("[x] Override mode"));
        assert!(human.contains("API timeout (api.timeout) = 30"));
        assert!(human.contains("theme (theme) = Dark [Dark|Light]"));

        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(json["mode"], "overriding");
        assert_eq!(json["schema"]["sections"][0]["id"]["type"], "overrides");
    }

    // ==================== List Tests ====================

    #[test]
    fn test_list_empty_while_locked() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let result = list(&ctx).unwrap();
        assert_eq!(result.count, 0);
    }

    #[test]
    fn test_list_while_overriding() {
        let env = TestEnv::new();
        let ctx = context(&env);
        override_mode(&ctx, true).unwrap();
        let result = list(&ctx).unwrap();
        assert_eq!(result.count, 3);
        assert_eq!(result.knobs[0].key, "api.timeout");
        assert_eq!(result.knobs[0].kind, "int");
        assert_eq!(result.knobs[1].group.as_deref(), Some("Features"));
    }

    // ==================== Get/Set Tests ====================

    #[test]
    fn test_get_prefers_remote_then_override() {
        let env = TestEnv::new();
        let ctx = context(&env);
        write_remote(&ctx, r#"{"api.timeout": 60}"#);

        let locked = get(&ctx, "api.timeout").unwrap();
        assert_eq!(locked.value, "60");
        assert_eq!(locked.source, ValueSource::Remote);
        assert!(locked.readonly);

        override_mode(&ctx, true).unwrap();
        assert!(set(&ctx, "api.timeout", "45").unwrap().applied);

        let overridden = get(&ctx, "api.timeout").unwrap();
        assert_eq!(overridden.value, "45");
        assert_eq!(overridden.source, ValueSource::Override);
        assert!(!overridden.readonly);
        assert_eq!(overridden.to_human(), "api.timeout = 45 (override)");
    }

    #[test]
    fn test_get_unknown_key() {
        let env = TestEnv::new();
        let ctx = context(&env);
        assert!(matches!(
            get(&ctx, "nope").unwrap_err(),
            Error::UnknownKey(_)
        ));
    }

    #[test]
    fn test_set_while_locked_is_not_applied() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let result = set(&ctx, "api.timeout", "45").unwrap();
        assert!(!result.applied);
        assert!(result.to_human().starts_with("Not set"));
        assert_eq!(get(&ctx, "api.timeout").unwrap().value, "30");
    }

    #[test]
    fn test_set_enum_by_raw_token() {
        let env = TestEnv::new();
        let ctx = context(&env);
        override_mode(&ctx, true).unwrap();
        set(&ctx, "theme", "light").unwrap();
        let result = get(&ctx, "theme").unwrap();
        assert_eq!(result.value, "light");
        assert_eq!(result.display, "Light");
    }

    #[test]
    fn test_set_rejects_bad_token() {
        let env = TestEnv::new();
        let ctx = context(&env);
        override_mode(&ctx, true).unwrap();
        assert!(matches!(
            set(&ctx, "api.timeout", "soon").unwrap_err(),
            Error::InvalidFormat(_)
        ));
    }

    // ==================== Override/Reset Tests ====================

    #[test]
    fn test_override_toggle_reports_change() {
        let env = TestEnv::new();
        let ctx = context(&env);
        assert!(override_mode(&ctx, true).unwrap().changed);
        let again = override_mode(&ctx, true).unwrap();
        assert!(!again.changed);
        assert_eq!(again.to_human(), "Override mode already overriding.");
        assert_eq!(override_mode(&ctx, false).unwrap().mode, OverrideMode::Locked);
    }

    #[test]
    fn test_reset_removes_overrides() {
        let env = TestEnv::new();
        let ctx = context(&env);
        override_mode(&ctx, true).unwrap();
        set(&ctx, "api.timeout", "45").unwrap();
        set(&ctx, "feature.new-ui", "true").unwrap();

        let result = reset(&ctx).unwrap();
        assert_eq!(result.removed, 2);
        assert_eq!(result.mode, OverrideMode::Overriding);
        assert_eq!(get(&ctx, "api.timeout").unwrap().source, ValueSource::Default);
    }

    #[test]
    fn test_reset_while_locked() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let result = reset(&ctx).unwrap();
        assert_eq!(result.removed, 0);
        assert_eq!(result.to_human(), "Nothing reset: override mode is off.");
    }
}
