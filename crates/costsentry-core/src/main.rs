//! CostSentry CLI
//!
//! Command-line entry point for the OCI cost guard.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use costsentry::monitor::{CheckCycle, Scheduler};
use costsentry::MonitorConfig;

/// CostSentry - cost guard for OCI tenancies
#[derive(Parser)]
#[command(name = "costsentry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (default: config.ini next to the executable)
    #[arg(short, long, env = "COSTSENTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Hours between checks
    #[arg(short, long, default_value_t = 2)]
    interval: u64,

    /// Execute a single check and exit instead of scheduling
    #[arg(long)]
    run_once: bool,

    /// Authenticate with the instance's ambient identity instead of a
    /// credentials file
    #[arg(long)]
    instance_principal: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    anyhow::ensure!(
        cli.interval > 0,
        "check interval must be a positive number of hours"
    );

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().context("cannot determine the default config path")?,
    };

    // Validate the configuration up front so a broken file fails the process
    // instead of silently skipping every scheduled check.
    MonitorConfig::load(&config_path, cli.instance_principal)
        .context("startup configuration check failed")?;

    let cycle = CheckCycle::new(config_path, cli.instance_principal);

    if cli.run_once {
        cycle.run_once().await;
        return Ok(());
    }

    let scheduler = Scheduler::new(cycle, Duration::from_secs(cli.interval * 60 * 60));
    tokio::select! {
        () = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping scheduler");
        }
    }
    Ok(())
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?;
    Ok(dir.join("config.ini"))
}
