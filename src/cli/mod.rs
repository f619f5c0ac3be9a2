//! CLI argument definitions for knobs.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Knobs - inspect and override a project's typed configuration values.
///
/// Values resolve as local override, then remote value, then declared default.
/// Start with `knobs status`, then `knobs override on` to edit.
#[derive(Parser, Debug)]
#[command(name = "knobs")]
#[command(author, version, about = "Inspect and override typed configuration knobs", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if knobs was started in <path> instead of the current directory.
    /// The path must exist. Can also be set via KNOBS_PROJECT environment variable.
    #[arg(short = 'C', long = "project", global = true, env = "KNOBS_PROJECT")]
    pub project_path: Option<PathBuf>,

    /// Knob manifest to load (default: knobs.kdl in the project directory)
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Remote snapshot file to read (default: remote.json in the data directory)
    #[arg(long = "remote", global = true)]
    pub remote_snapshot: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the grouped display schema
    Show,

    /// List declared knobs (empty while override mode is off)
    List,

    /// Resolve one knob and report its source
    Get {
        /// Knob key (e.g., api.timeout)
        key: String,
    },

    /// Store a local override for a knob
    ///
    /// Only takes effect while override mode is on.
    Set {
        /// Knob key
        key: String,
        /// Serialized value (e.g., 45, true, eu,us)
        value: String,
    },

    /// Turn override mode on or off
    Override {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Remove every local override
    Reset,

    /// Show override mode, file locations and build info
    Status,

    /// Remote snapshot commands
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },

    /// Tool configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// On/off argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        matches!(self, Toggle::On)
    }
}

/// Remote snapshot subcommands
#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Import a downloaded JSON document as the remote snapshot
    Import {
        /// JSON file holding remote key/value pairs
        file: PathBuf,
    },
}

/// Tool configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each came from
    Show,

    /// Write one setting to the project config (or the system config)
    Set {
        /// Setting name (manifest, remote-snapshot, output-format, log-level)
        key: String,
        /// Setting value
        value: String,
        /// Write the system config instead of the project config
        #[arg(long)]
        system: bool,
    },
}
