//! `simulate` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{PipelineBlueprint, Transport};
use simulator::{EventGenerator, Journey, JourneyConfig, JourneySummary};
use tokio::sync::watch;
use tracing::info;

use crate::cli::SimulateArgs;
use crate::error::CliError;
use crate::runtime::{apply_journey_overrides, load_blueprint, shutdown_flag};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;
    apply_journey_overrides(&mut blueprint, &args.journey);

    let address = blueprint.transport.parse_address().map_err(CliError::from)?;
    let transport = transport::connect(&address)
        .await
        .map_err(CliError::from)
        .with_context(|| format!("Failed to connect to {}", blueprint.transport.address))?;
    info!(address = %blueprint.transport.address, "Transport connected");

    let summary = drive_journey(&blueprint, Arc::new(transport), shutdown_flag()).await?;
    print!("\n{summary}");
    println!();
    Ok(())
}

/// Run one journey over `transport` until arrival, step limit or `shutdown`
pub(crate) async fn drive_journey<T>(
    blueprint: &PipelineBlueprint,
    transport: Arc<T>,
    shutdown: watch::Receiver<bool>,
) -> Result<JourneySummary>
where
    T: Transport + Sync + 'static,
{
    let generator = EventGenerator::from_config(&blueprint.simulation, blueprint.vehicle.clone());
    let journey = Journey::new(JourneyConfig::from_blueprint(blueprint), generator, transport);

    info!(
        device_id = %blueprint.simulation.device_id,
        origin = %blueprint.simulation.origin,
        destination = %blueprint.simulation.destination,
        seed = ?blueprint.simulation.seed,
        "Starting journey"
    );

    let summary = journey
        .run(shutdown)
        .await
        .map_err(CliError::from)
        .context("Journey execution failed")?;

    info!(
        outcome = %summary.outcome,
        steps = summary.steps,
        delivered = summary.publish.delivered,
        failed = summary.publish.failed,
        "Journey finished"
    );
    Ok(summary)
}
