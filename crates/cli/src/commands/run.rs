//! `run` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use simulator::JourneyOutcome;
use tracing::info;

use crate::cli::RunArgs;
use crate::commands::ingest::start_pipelines;
use crate::commands::simulate::drive_journey;
use crate::error::CliError;
use crate::runtime::{
    apply_journey_overrides, load_blueprint, shutdown_flag, wait_for_flag, IngestReport,
};

/// Execute the `run` command
///
/// The journey and the topic pipelines share one transport. Once the journey
/// ends the pipelines drain what was published and exit; a shutdown signal
/// stops both at their next boundary.
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;
    apply_journey_overrides(&mut blueprint, &args.journey);

    let address = blueprint.transport.parse_address().map_err(CliError::from)?;
    let transport = Arc::new(
        transport::connect(&address)
            .await
            .map_err(CliError::from)
            .with_context(|| format!("Failed to connect to {}", blueprint.transport.address))?,
    );

    let shutdown = shutdown_flag();
    let supervisor = start_pipelines(&blueprint, Arc::clone(&transport)).await?;

    let journey = drive_journey(&blueprint, transport, shutdown.clone()).await;

    let interrupted = matches!(&journey, Ok(s) if s.outcome == JourneyOutcome::Interrupted);
    if interrupted || journey.is_err() {
        supervisor.stop();
    } else {
        info!("Journey complete, draining topics");
        supervisor.drain();
    }
    let results = supervisor.wait_or_stop(wait_for_flag(shutdown)).await;

    let summary = journey?;
    print!("\n{summary}");

    let report = IngestReport::new(results);
    report.print_summary();
    report.into_result()?;
    Ok(())
}
