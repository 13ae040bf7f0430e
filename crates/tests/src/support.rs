//! Shared fixtures for the end-to-end scenarios

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::AsArray;
use arrow::record_batch::RecordBatch;
use arrow::datatypes::UInt64Type;
use chrono::{DateTime, Utc};
use contracts::{ObjectStore, PipelineBlueprint};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use persistence::{
    CheckpointStore, PersistenceError, PipelineSummary, RetryPolicy, SupervisorBuilder,
    OFFSET_COLUMN,
};
use schema_registry::SchemaRegistry;
use simulator::{EventGenerator, Journey, JourneyConfig, JourneySummary};
use tokio::sync::watch;
use transport::MemoryTransport;

pub const START: &str = "2024-01-01T08:00:00Z";

pub fn start_time() -> DateTime<Utc> {
    START.parse().unwrap()
}

/// Seeded, unpaced, in-memory configuration
pub fn blueprint(seed: u64, max_steps: Option<u64>) -> PipelineBlueprint {
    let mut blueprint = PipelineBlueprint::default();
    blueprint.transport.address = "memory://".to_string();
    blueprint.simulation.seed = Some(seed);
    blueprint.simulation.max_steps = max_steps;
    blueprint.simulation.pacing_ms = 0;
    blueprint.simulation.start_time = Some(start_time());
    blueprint.ingestion.poll_interval_ms = 5;
    blueprint
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial: Duration::from_millis(1),
        max: Duration::from_millis(5),
    }
}

/// Drive a whole journey into `transport`
pub async fn publish_journey(
    blueprint: &PipelineBlueprint,
    transport: &Arc<MemoryTransport>,
) -> JourneySummary {
    let generator = EventGenerator::from_config(&blueprint.simulation, blueprint.vehicle.clone());
    let journey = Journey::new(
        JourneyConfig::from_blueprint(blueprint),
        generator,
        Arc::clone(transport),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    journey.run(shutdown_rx).await.unwrap()
}

/// Persist every topic until drained
pub async fn persist_all<S>(
    blueprint: &PipelineBlueprint,
    transport: &Arc<MemoryTransport>,
    store: &Arc<S>,
) -> BTreeMap<String, Result<PipelineSummary, PersistenceError>>
where
    S: ObjectStore + Sync + 'static,
{
    let registry = Arc::new(SchemaRegistry::new(&blueprint.topics).unwrap());
    let supervisor = SupervisorBuilder::new(registry, Arc::clone(transport), Arc::clone(store))
        .ingestion(blueprint.ingestion.clone())
        .storage(blueprint.storage.clone())
        .retry(fast_retry())
        .build()
        .unwrap();
    supervisor.drain();
    supervisor.wait().await.into_iter().collect()
}

/// Data files named by the committed checkpoints of `topic`
pub async fn committed_files<S: ObjectStore + Sync>(store: &Arc<S>, topic: &str) -> Vec<String> {
    CheckpointStore::new(Arc::clone(store), topic)
        .commits()
        .await
        .unwrap()
        .into_iter()
        .flat_map(|c| c.files)
        .collect()
}

/// Every `.parquet` object stored under `topic`
pub async fn stored_files<S: ObjectStore + Sync>(store: &Arc<S>, topic: &str) -> Vec<String> {
    store
        .list(&format!("{topic}/"))
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.ends_with(".parquet"))
        .collect()
}

pub async fn read_parquet<S: ObjectStore + Sync>(store: &Arc<S>, path: &str) -> Vec<RecordBatch> {
    let bytes = store.get(path).await.unwrap().unwrap();
    ParquetRecordBatchReaderBuilder::try_new(bytes)
        .unwrap()
        .build()
        .unwrap()
        .map(|batch| batch.unwrap())
        .collect()
}

/// Offsets persisted for `topic` across all committed files, in file order
pub async fn persisted_offsets<S: ObjectStore + Sync>(store: &Arc<S>, topic: &str) -> Vec<u64> {
    let mut offsets = Vec::new();
    for path in committed_files(store, topic).await {
        for batch in read_parquet(store, &path).await {
            let column = batch.column_by_name(OFFSET_COLUMN).unwrap();
            offsets.extend(column.as_primitive::<UInt64Type>().values().iter().copied());
        }
    }
    offsets
}
