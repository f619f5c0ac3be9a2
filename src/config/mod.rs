//! Tool configuration for the `knobs` command.
//!
//! `config.kdl` holds preferences for the command-line front end, not knob
//! values. It is looked up in two places:
//! - System: `$KNOBS_CONFIG_DIR/config.kdl` or `~/.config/knobs/config.kdl`
//! - Project: `~/.local/share/knobs/<project-hash>/config.kdl`
//!
//! Contains:
//! - `manifest` - Path of the knob manifest
//! - `remote-snapshot` - Path of the cached remote snapshot
//! - `output-format` - "json" or "human"
//! - `log-level` - error/warn/info/debug/trace
//!
//! ## Precedence
//!
//! CLI flag > project config > system config > defaults.
//!
//! `knobs config set` writes one setting into either file.
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, CONFIG_FILE, ConfigOverrides, Resolved, ResolvedConfig, SettingSource,
    project_config_path, resolve_config, system_config_path,
};
pub use schema::{KnobsConfig, LOG_LEVELS, OutputFormat, SETTING_KEYS};
