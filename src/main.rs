//! knobs CLI - inspect and override a project's typed configuration values.

use clap::Parser;
use knobs::cli::{Cli, Commands, ConfigCommands, RemoteCommands};
use knobs::commands::{self, Context, Output};
use knobs::config::{ConfigOverrides, OutputFormat};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a full tracing filter directive.
const LOG_ENV: &str = "KNOBS_LOG";

fn main() {
    let cli = Cli::parse();

    let overrides = config_overrides(&cli);
    let project_path = resolve_project_path(cli.project_path.clone(), cli.human_readable);

    let ctx = match Context::resolve(&project_path, &overrides) {
        Ok(ctx) => ctx,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };

    init_logging(ctx.config.log_level());
    tracing::debug!(
        "project {} uses data dir {}",
        ctx.project_dir.display(),
        ctx.data_dir.display()
    );

    let human = *ctx.config.output_format() == OutputFormat::Human;
    if let Err(e) = run_command(cli.command, &ctx, human) {
        exit_with_error(&e, human);
    }
}

fn config_overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if let Some(ref path) = cli.manifest {
        overrides = overrides.with_manifest(path);
    }
    if let Some(ref path) = cli.remote_snapshot {
        overrides = overrides.with_remote_snapshot(path);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if cli.verbose {
        overrides = overrides.with_log_level("debug");
    }
    overrides
}

/// Install the stderr subscriber. `KNOBS_LOG` wins over the resolved level.
fn init_logging(level: &str) {
    let filter = env::var(LOG_ENV)
        .ok()
        .filter(|directive| !directive.is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("knobs={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the project path from the explicit flag or the current directory.
///
/// Priority: --project flag > KNOBS_PROJECT env var > current working directory
fn resolve_project_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let e = knobs::Error::InvalidInput(format!(
                    "Specified project path does not exist: {}",
                    path.display()
                ));
                exit_with_error(&e, human);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn run_command(
    command: Option<Commands>,
    ctx: &Context,
    human: bool,
) -> Result<(), knobs::Error> {
    match command {
        Some(Commands::Show) => output(&commands::show(ctx)?, human),
        Some(Commands::List) => output(&commands::list(ctx)?, human),
        Some(Commands::Get { key }) => output(&commands::get(ctx, &key)?, human),
        Some(Commands::Set { key, value }) => output(&commands::set(ctx, &key, &value)?, human),
        Some(Commands::Override { state }) => {
            output(&commands::override_mode(ctx, state.is_on())?, human)
        }
        Some(Commands::Reset) => output(&commands::reset(ctx)?, human),
        Some(Commands::Remote { command }) => match command {
            RemoteCommands::Import { file } => {
                output(&commands::remote_import(ctx, &file)?, human)
            }
        },
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => output(&commands::config_show(ctx), human),
            ConfigCommands::Set { key, value, system } => {
                output(&commands::config_set(ctx, &key, &value, system)?, human)
            }
        },
        Some(Commands::Status) | None => output(&commands::status(ctx)?, human),
    }
    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn exit_with_error(e: &knobs::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}
