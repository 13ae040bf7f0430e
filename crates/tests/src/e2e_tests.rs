//! Journey to Parquet over a shared in-memory transport

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{TimestampMicrosecondType, UInt64Type};
use contracts::{ObjectStore, RecordKind};
use persistence::{FsObjectStore, StopReason, LATE_COLUMN, OFFSET_COLUMN};
use simulator::JourneyOutcome;
use transport::MemoryTransport;

use crate::support::{
    blueprint, committed_files, persist_all, persisted_offsets, publish_journey, read_parquet,
    stored_files,
};

/// `_offset` -> event time (micros) for every persisted row of `topic`
async fn event_times<S: ObjectStore + Sync>(store: &Arc<S>, topic: &str) -> BTreeMap<u64, i64> {
    let mut times = BTreeMap::new();
    for path in committed_files(store, topic).await {
        for batch in read_parquet(store, &path).await {
            let offsets = batch
                .column_by_name(OFFSET_COLUMN)
                .unwrap()
                .as_primitive::<UInt64Type>();
            let timestamps = batch
                .column_by_name("timestamp")
                .unwrap()
                .as_primitive::<TimestampMicrosecondType>();
            for row in 0..batch.num_rows() {
                times.insert(offsets.value(row), timestamps.value(row));
            }
        }
    }
    times
}

#[tokio::test]
async fn test_full_route_lands_in_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let mut bp = blueprint(7, None);
    bp.storage.base_path = dir.path().to_path_buf();

    let transport = Arc::new(MemoryTransport::new());
    let journey = publish_journey(&bp, &transport).await;
    assert_eq!(journey.outcome, JourneyOutcome::Arrived);
    assert!(journey.steps > 0);
    assert_eq!(journey.publish.delivered, journey.steps * 5);
    assert_eq!(journey.publish.failed, 0);

    let store = Arc::new(FsObjectStore::open(dir.path()).await.unwrap());
    let results = persist_all(&bp, &transport, &store).await;
    assert_eq!(results.len(), 5);

    for (kind, topic) in bp.topics.iter() {
        let summary = results[topic].as_ref().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Drained, "{kind}");
        assert_eq!(summary.records, journey.steps, "{kind}");
        assert_eq!(summary.next_offset, journey.steps, "{kind}");
        assert_eq!(summary.rejected_records, 0, "{kind}");
        assert_eq!(summary.late_records, 0, "{kind}");

        let mut offsets = persisted_offsets(&store, topic).await;
        offsets.sort_unstable();
        assert_eq!(offsets, (0..journey.steps).collect::<Vec<_>>(), "{kind}");

        // Nothing on disk beyond what the commits name
        let mut committed = committed_files(&store, topic).await;
        committed.sort();
        assert_eq!(stored_files(&store, topic).await, committed, "{kind}");
        assert!(committed
            .iter()
            .all(|p| p.starts_with(&format!("{topic}/date=2024-01-01/hour="))));
        assert!(committed.iter().any(|p| p.contains("/hour=08/")));
    }

    // Records of one step share their timestamp across topics
    let vehicle = event_times(&store, bp.topics.topic_for(RecordKind::Vehicle)).await;
    for kind in [RecordKind::Gps, RecordKind::Traffic, RecordKind::Weather, RecordKind::Emergency] {
        assert_eq!(event_times(&store, bp.topics.topic_for(kind)).await, vehicle, "{kind}");
    }
    // The arrival tick itself publishes nothing
    let last = vehicle.values().last().copied().unwrap();
    assert!(last < journey.final_time.timestamp_micros());
}

#[tokio::test]
async fn test_step_limited_journey_columns() {
    let dir = tempfile::tempdir().unwrap();
    let mut bp = blueprint(11, Some(12));
    bp.storage.base_path = dir.path().to_path_buf();
    bp.ingestion.max_batch_records = 5;

    let transport = Arc::new(MemoryTransport::new());
    let journey = publish_journey(&bp, &transport).await;
    assert_eq!(journey.outcome, JourneyOutcome::StepLimit);
    assert_eq!(journey.steps, 12);

    let store = Arc::new(FsObjectStore::open(dir.path()).await.unwrap());
    let results = persist_all(&bp, &transport, &store).await;
    let weather = results["weather_data"].as_ref().unwrap();
    assert_eq!(weather.batches, 3);
    assert_eq!(weather.records, 12);

    let mut rows = 0;
    for path in committed_files(&store, "weather_data").await {
        for batch in read_parquet(&store, &path).await {
            rows += batch.num_rows();
            let devices = batch.column_by_name("deviceId").unwrap().as_string::<i32>();
            assert!(devices.iter().all(|d| d == Some("Vehicle-Samkons")));

            let location = batch.column_by_name("location").unwrap().as_struct();
            assert_eq!(location.null_count(), 0);
            let latitude = location
                .column_by_name("latitude")
                .unwrap()
                .as_primitive::<arrow::datatypes::Float64Type>();
            assert!(latitude.values().iter().all(|lat| (51.0..53.0).contains(lat)));

            let late = batch.column_by_name(LATE_COLUMN).unwrap().as_boolean();
            assert_eq!(late.true_count(), 0);
        }
    }
    assert_eq!(rows, 12);
}
