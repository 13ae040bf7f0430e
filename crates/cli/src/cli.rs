//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Smart City - vehicle telemetry simulator and Parquet persistence pipeline
#[derive(Parser, Debug)]
#[command(
    name = "smart-city",
    author,
    version,
    about = "Smart-city vehicle telemetry simulator and persistence pipeline",
    long_about = "Simulates a vehicle driving from London to Birmingham, publishes five \n\
                  correlated telemetry streams, and persists them as event-time \n\
                  partitioned Parquet with exactly-once checkpoints."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SMART_CITY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SMART_CITY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Expose Prometheus metrics on this port
    #[arg(long, global = true, env = "SMART_CITY_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the simulated journey and publish telemetry
    Simulate(SimulateArgs),

    /// Persist every topic to Parquet until interrupted
    Ingest(IngestArgs),

    /// Simulate and ingest in one process over a shared transport
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Print the registered topic schemas
    Schemas(SchemasArgs),
}

/// Configuration source and overrides shared by the running commands
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "SMART_CITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the transport address (memory:// or file://<dir>)
    #[arg(long, env = "SMART_CITY_TRANSPORT")]
    pub transport: Option<String>,

    /// Override the vehicle topic name
    #[arg(long, env = "VEHICLE_TOPIC")]
    pub vehicle_topic: Option<String>,

    /// Override the GPS topic name
    #[arg(long, env = "GPS_TOPIC")]
    pub gps_topic: Option<String>,

    /// Override the traffic camera topic name
    #[arg(long, env = "TRAFFIC_TOPIC")]
    pub traffic_topic: Option<String>,

    /// Override the weather topic name
    #[arg(long, env = "WEATHER_TOPIC")]
    pub weather_topic: Option<String>,

    /// Override the emergency incident topic name
    #[arg(long, env = "EMERGENCY_TOPIC")]
    pub emergency_topic: Option<String>,

    /// Override the storage root directory
    #[arg(short, long, env = "SMART_CITY_OUTPUT")]
    pub output: Option<PathBuf>,
}

/// Journey overrides
#[derive(Args, Debug, Clone, Default)]
pub struct JourneyArgs {
    /// RNG seed for a reproducible journey
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many steps
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Wall-clock pause between steps in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub journey: JourneyArgs,
}

/// Arguments for the `ingest` command
#[derive(Parser, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Exit once every topic is caught up instead of waiting for new records
    #[arg(long)]
    pub drain: bool,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub journey: JourneyArgs,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "smart-city.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `schemas` command
#[derive(Parser, Debug)]
pub struct SchemasArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate_overrides() {
        let cli = Cli::try_parse_from([
            "smart-city",
            "-v",
            "simulate",
            "--transport",
            "memory://",
            "--gps-topic",
            "gps_v2",
            "--seed",
            "42",
            "--max-steps",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.config.transport.as_deref(), Some("memory://"));
                assert_eq!(args.config.gps_topic.as_deref(), Some("gps_v2"));
                assert_eq!(args.journey.seed, Some(42));
                assert_eq!(args.journey.max_steps, Some(10));
                assert_eq!(args.journey.pacing_ms, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["smart-city", "-q", "-v", "schemas"]).is_err());
    }
}
