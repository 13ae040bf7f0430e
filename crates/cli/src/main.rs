//! # Smart City CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Journey simulation and topic persistence
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod runtime;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_ingest, run_pipeline, run_schemas, run_simulate, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_observability(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Smart City CLI starting");

    let result = match &cli.command {
        Commands::Simulate(args) => run_simulate(args).await,
        Commands::Ingest(args) => run_ingest(args).await,
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Schemas(args) => run_schemas(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging (and metrics export) based on CLI options
fn init_observability(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: cli.metrics_port,
        default_log_level: default_log_level.to_string(),
        force_level: cli.quiet,
    })
}
