//! `ingest` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{PipelineBlueprint, Transport};
use persistence::{FsObjectStore, Supervisor, SupervisorBuilder};
use schema_registry::SchemaRegistry;
use tracing::info;

use crate::cli::IngestArgs;
use crate::error::CliError;
use crate::runtime::{load_blueprint, shutdown_signal, IngestReport};

/// Execute the `ingest` command
pub async fn run_ingest(args: &IngestArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;

    let address = blueprint.transport.parse_address().map_err(CliError::from)?;
    let transport = transport::connect(&address)
        .await
        .map_err(CliError::from)
        .with_context(|| format!("Failed to connect to {}", blueprint.transport.address))?;

    let supervisor = start_pipelines(&blueprint, Arc::new(transport)).await?;

    if args.drain {
        supervisor.drain();
    }
    let results = supervisor.wait_or_stop(shutdown_signal()).await;

    let report = IngestReport::new(results);
    report.print_summary();
    report.into_result()?;
    Ok(())
}

/// Open the store and start one pipeline per configured topic
pub(crate) async fn start_pipelines<T>(
    blueprint: &PipelineBlueprint,
    transport: Arc<T>,
) -> Result<Supervisor>
where
    T: Transport + Sync + 'static,
{
    let store = FsObjectStore::open(&blueprint.storage.base_path)
        .await
        .map_err(CliError::from)
        .with_context(|| {
            format!(
                "Failed to open storage at {}",
                blueprint.storage.base_path.display()
            )
        })?;
    let registry = SchemaRegistry::new(&blueprint.topics).map_err(CliError::from)?;

    let supervisor = SupervisorBuilder::new(Arc::new(registry), transport, Arc::new(store))
        .ingestion(blueprint.ingestion.clone())
        .storage(blueprint.storage.clone())
        .build()
        .map_err(CliError::from)?;

    info!(
        topics = ?supervisor.topics().collect::<Vec<_>>(),
        base_path = %blueprint.storage.base_path.display(),
        "Pipelines started"
    );
    Ok(supervisor)
}
