//! Crash and restart: output must match an uninterrupted run exactly

use std::sync::Arc;
use std::time::Duration;

use contracts::PipelineBlueprint;
use persistence::{CheckpointStore, MemoryObjectStore, StopReason, SupervisorBuilder};
use schema_registry::SchemaRegistry;
use transport::MemoryTransport;

use crate::support::{
    blueprint, committed_files, fast_retry, persist_all, persisted_offsets, publish_journey,
    stored_files,
};

/// `(batch_id, next_offset, records, files)` per commit, ignoring wall-clock fields
async fn commit_log(
    store: &Arc<MemoryObjectStore>,
    topic: &str,
) -> Vec<(u64, u64, u64, Vec<String>)> {
    CheckpointStore::new(Arc::clone(store), topic)
        .commits()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.batch_id, c.next_offset, c.records, c.files))
        .collect()
}

async fn assert_same_output(
    bp: &PipelineBlueprint,
    reference: &Arc<MemoryObjectStore>,
    recovered: &Arc<MemoryObjectStore>,
) {
    for (kind, topic) in bp.topics.iter() {
        assert_eq!(
            commit_log(recovered, topic).await,
            commit_log(reference, topic).await,
            "{kind}"
        );
        assert_eq!(
            stored_files(recovered, topic).await,
            stored_files(reference, topic).await,
            "{kind}"
        );

        let offsets = persisted_offsets(recovered, topic).await;
        let mut unique = offsets.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(offsets.len(), unique.len(), "{kind}: duplicated rows");
        assert_eq!(offsets, persisted_offsets(reference, topic).await, "{kind}");

        for path in committed_files(recovered, topic).await {
            assert!(recovered.paths().contains(&path), "{kind}: {path} missing");
        }
    }
}

async fn setup() -> (PipelineBlueprint, Arc<MemoryTransport>, Arc<MemoryObjectStore>) {
    let mut bp = blueprint(23, Some(20));
    bp.ingestion.max_batch_records = 7;

    let transport = Arc::new(MemoryTransport::new());
    let journey = publish_journey(&bp, &transport).await;
    assert_eq!(journey.steps, 20);

    let reference = Arc::new(MemoryObjectStore::new());
    for (topic, result) in persist_all(&bp, &transport, &reference).await {
        let summary = result.unwrap();
        assert_eq!(summary.batches, 3, "{topic}");
        assert_eq!(summary.records, 20, "{topic}");
    }
    (bp, transport, reference)
}

#[tokio::test]
async fn test_crash_mid_batch_then_restart_is_exactly_once() {
    let (bp, transport, reference) = setup().await;

    // One put lands (necessarily a plan), everything after fails
    let store = Arc::new(MemoryObjectStore::new());
    store.fail_after_puts(1);

    let registry = Arc::new(SchemaRegistry::new(&bp.topics).unwrap());
    let supervisor = SupervisorBuilder::new(registry, Arc::clone(&transport), Arc::clone(&store))
        .ingestion(bp.ingestion.clone())
        .storage(bp.storage.clone())
        .retry(fast_retry())
        .build()
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while supervisor.metrics().iter().any(|m| m.sink.write_failures == 0) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();

    supervisor.stop();
    for (topic, result) in supervisor.wait().await {
        let summary = result.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Stopped, "{topic}");
        assert_eq!(summary.batches, 0, "{topic}");
    }
    assert_eq!(store.paths().len(), 1);
    assert!(store.paths()[0].ends_with("/offsets/0.json"));

    store.heal();
    let results = persist_all(&bp, &transport, &store).await;
    let replayed: Vec<_> = results
        .iter()
        .filter(|(_, r)| r.as_ref().unwrap().replayed)
        .map(|(topic, _)| topic.clone())
        .collect();
    assert_eq!(replayed.len(), 1);
    for (topic, result) in &results {
        let summary = result.as_ref().unwrap();
        assert_eq!(summary.resumed_from, 0, "{topic}");
        assert_eq!(summary.next_offset, 20, "{topic}");
    }

    assert_same_output(&bp, &reference, &store).await;
}

#[tokio::test]
async fn test_restart_after_committed_batches() {
    let (bp, transport, reference) = setup().await;

    // First process only persists the first batch of each topic
    let store = Arc::new(MemoryObjectStore::new());
    let registry = Arc::new(SchemaRegistry::new(&bp.topics).unwrap());
    let supervisor = SupervisorBuilder::new(registry, Arc::clone(&transport), Arc::clone(&store))
        .ingestion(bp.ingestion.clone())
        .storage(bp.storage.clone())
        .retry(fast_retry())
        .build()
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while supervisor.metrics().iter().any(|m| m.sink.batches_committed == 0) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    supervisor.stop();
    let stopped = supervisor.wait().await;
    assert!(stopped.iter().all(|(_, r)| r.as_ref().unwrap().batches >= 1));

    let results = persist_all(&bp, &transport, &store).await;
    for (topic, result) in &results {
        let summary = result.as_ref().unwrap();
        assert!(summary.resumed_from >= 7, "{topic}");
        assert_eq!(summary.next_offset, 20, "{topic}");
    }

    assert_same_output(&bp, &reference, &store).await;
}

#[tokio::test]
async fn test_transient_write_failures_are_retried() {
    let (bp, transport, reference) = setup().await;

    let store = Arc::new(MemoryObjectStore::new());
    store.fail_next_puts(3);
    let results = persist_all(&bp, &transport, &store).await;
    for (topic, result) in &results {
        assert_eq!(result.as_ref().unwrap().records, 20, "{topic}");
    }

    assert_same_output(&bp, &reference, &store).await;
}
