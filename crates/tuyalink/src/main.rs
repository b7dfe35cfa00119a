mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tuyalink_core::{Coordinator, CoordinatorConfig};

use crate::cli::{Cli, Command, GlobalOpts, WatchArgs};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the cloud
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        cmd => {
            let (profile_name, config) = build_coordinator_config(&cli.global, &cmd)?;
            let coordinator = Coordinator::new(config)?;

            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            commands::dispatch(cmd, &coordinator, &cli.global)
                .await
                .map_err(|e| e.with_profile(&profile_name))
        }
    }
}

/// Build a `CoordinatorConfig` from the config file, profile, and CLI
/// overrides.
fn build_coordinator_config(
    global: &GlobalOpts,
    cmd: &Command,
) -> Result<(String, CoordinatorConfig), CliError> {
    let cfg = tuyalink_config::load_config()?;
    let profile_name = tuyalink_config::active_profile_name(global.profile.as_deref(), &cfg);

    let mut profile = match tuyalink_config::find_profile(&cfg, &profile_name) {
        Ok(profile) => profile.clone(),
        Err(_) if cfg.profiles.is_empty() => {
            return Err(CliError::NoConfig {
                path: tuyalink_config::config_path().display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(ref device) = global.device {
        profile.device_id.clone_from(device);
    }
    if let Some(ref region) = global.region {
        profile.region.clone_from(region);
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
    if let Command::Watch(WatchArgs { poll: Some(secs) }) = cmd {
        profile.poll_seconds = Some(*secs);
    }

    let config =
        tuyalink_config::profile_to_coordinator_config(&profile, &profile_name, &cfg.defaults)?;
    Ok((profile_name, config))
}
