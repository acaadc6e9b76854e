use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing::info;

use simfleet_core::{FleetConfig, Settings};
use simfleet_executor::{FleetExecutor, FleetRun, RunOverrides};
use simfleet_provision::{CommandProvisioner, RemoteCli};

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub ui: Option<String>,
    pub continue_on_error: bool,
    pub state_file: Option<PathBuf>,
}

/// Execute a fleet config and print the report. Exits non-zero unless the
/// run was `ok`, or `partial` with failures tolerated.
pub fn run(settings: &Settings, args: RunArgs) -> anyhow::Result<ExitCode> {
    let path = args
        .config
        .or_else(|| settings.fleet_config.clone())
        .context("no fleet config given: pass --config or set fleet_config in settings")?;
    let config =
        FleetConfig::from_file(&path).with_context(|| format!("failed to load fleet config {}", path.display()))?;

    let overrides = RunOverrides {
        ui_url: args.ui,
        continue_on_error: args.continue_on_error.then_some(true),
        state_file: args.state_file,
    };
    let run = FleetRun::new(config, settings, overrides).context("invalid fleet config")?;
    info!(
        config = %path.display(),
        run_id = %run.run_id,
        state_file = %run.state_file.display(),
        "starting fleet run"
    );

    let executor = FleetExecutor::new(
        CommandProvisioner::new(settings.provisioner_argv(), settings.provision_timeout()),
        RemoteCli::new(
            vec![settings.remote_cli().to_string()],
            settings.service_unit(),
            settings.command_timeout(),
        ),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(executor.run(&run));

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
