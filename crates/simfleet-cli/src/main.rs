//! simfleet — provision, drive and capture fleets of simulation instances.
//!
//! # Usage
//!
//! ```text
//! simfleet run --config fleet.json [--ui localhost:5050] [--continue-on-error]
//! simfleet state list
//! simfleet state forget <instance-id>
//! ```
//!
//! The run report is printed as JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use simfleet_core::Settings;

mod commands;

#[derive(Parser)]
#[command(
    name = "simfleet",
    about = "simfleet — fleet deployment orchestrator for simulation instances",
    version,
    propagate_version = true
)]
struct Cli {
    /// Operator settings file (default: $SIMFLEET_SETTINGS, then
    /// ~/.simfleet/config.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision and run every deployment in a fleet config
    Run {
        /// Fleet config file (JSON). Falls back to `fleet_config` in settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Metrics UI address, overriding the fleet config
        #[arg(long)]
        ui: Option<String>,
        /// Record instance failures and keep going
        #[arg(long)]
        continue_on_error: bool,
        /// Instance state file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    /// Inspect the instance state file
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Print every recorded instance as JSON
    List {
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    /// Remove an instance record
    Forget {
        /// Instance id
        id: String,
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,simfleet=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let settings = Settings::discover(cli.settings.as_deref())?;

    match cli.command {
        Commands::Run {
            config,
            ui,
            continue_on_error,
            state_file,
        } => commands::run::run(
            &settings,
            commands::run::RunArgs {
                config,
                ui,
                continue_on_error,
                state_file,
            },
        ),
        Commands::State { action } => match action {
            StateAction::List { state_file } => commands::state::list(&settings, state_file),
            StateAction::Forget { id, state_file } => commands::state::forget(&settings, &id, state_file),
        },
    }
}
