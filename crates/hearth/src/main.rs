//! Hearth - in-memory session store
//!
//! Main entry point for the Hearth CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use hearth_config::{LoadedConfig, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{config, simulate};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Hearth - in-memory session store
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Load this config file instead of discovering one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// User config directory (default: $HEARTH_CONFIG_DIR or the platform config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved configuration and check the provider accepts it
    Config(config::ConfigArgs),

    /// Drive a session provider with concurrent simulated clients
    Simulate(simulate::SimulateArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match cli.config {
        Some(ref path) => LoadedConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => hearth_config::discover(None, cli.config_dir.as_deref())
            .context("loading configuration")?,
    };

    let _guard = init_tracing(&loaded.config.logging(), cli.verbose)?;

    for warning in loaded.warnings() {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        config: loaded,
        config_dir: cli.config_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Simulate(args) => simulate::run(args, &ctx).await,
    }
}

/// Install the tracing subscriber: a console layer on stderr plus, when a log
/// directory is configured, a daily-rolled JSON file layer.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, Layer, Registry};

    let filter = if verbose {
        "hearth=debug,hearth_session=debug,hearth_config=debug,info"
    } else {
        logging.level.as_str()
    };
    let console_filter =
        EnvFilter::try_new(filter).with_context(|| format!("invalid log filter '{filter}'"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if logging.json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    let mut guard = None;
    if let Some(ref dir) = logging.directory {
        let file_appender = tracing_appender::rolling::daily(dir, "hearth.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "hearth=trace,hearth_session=trace,hearth_config=trace,info",
                ))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
