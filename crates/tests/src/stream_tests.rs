//! Record streams through transport, reader and schema validation

use std::sync::Arc;

use arrow::array::AsArray;
use arrow::datatypes::UInt64Type;
use bytes::Bytes;
use contracts::{OutboundMessage, RecordKind, Transport};
use ingestion::{ReaderConfig, StreamReader};
use persistence::{MemoryObjectStore, LATE_COLUMN, OFFSET_COLUMN};
use schema_registry::{decode_record, SchemaRegistry};
use serde_json::json;
use simulator::{EventGenerator, Publisher, StepOutcome};
use transport::{FileLogTransport, MemoryTransport};

use crate::support::{blueprint, committed_files, persist_all, publish_journey, read_parquet};

fn gps_payload(n: u32, timestamp: &str) -> serde_json::Value {
    json!({
        "id": format!("00000000-0000-4000-8000-{n:012}"),
        "deviceId": "Vehicle-Samkons",
        "timestamp": timestamp,
        "speed": 42.5,
        "direction": "North-East",
        "vehicleType": "private",
    })
}

async fn send(transport: &MemoryTransport, topic: &str, n: u32, payload: &serde_json::Value) {
    transport
        .send(OutboundMessage {
            topic: topic.to_string(),
            key: n.to_string(),
            payload: Bytes::from(serde_json::to_vec(payload).unwrap()),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_generated_records_survive_every_topic() {
    let bp = blueprint(5, None);
    let registry = SchemaRegistry::new(&bp.topics).unwrap();
    let transport = Arc::new(MemoryTransport::new());

    let mut generator = EventGenerator::from_config(&bp.simulation, bp.vehicle.clone());
    let StepOutcome::Records(step) = generator.step(&bp.simulation.device_id).unwrap() else {
        panic!("route ended on the first step");
    };
    let records = (*step).into_records();

    let mut publisher = Publisher::new(Arc::clone(&transport));
    for record in &records {
        publisher
            .publish(bp.topics.topic_for(record.kind()), record)
            .unwrap();
    }
    publisher.flush().await;
    assert_eq!(publisher.metrics().snapshot().delivered, 5);

    for record in &records {
        let topic = bp.topics.topic_for(record.kind());
        let mut reader = StreamReader::new(
            topic,
            &registry,
            Arc::clone(&transport),
            ReaderConfig::default(),
        )
        .unwrap();
        let batch = reader.poll().await.unwrap();
        assert_eq!(batch.rejected, 0, "{topic}");
        assert_eq!(batch.records.len(), 1, "{topic}");

        let ingested = &batch.records[0];
        assert_eq!(ingested.event_time, record.timestamp());
        assert!(!ingested.late);
        let decoded = decode_record(reader.schema(), &ingested.row).unwrap();
        assert_eq!(&decoded, record, "{topic}");
    }
}

#[tokio::test]
async fn test_invalid_record_is_rejected_without_moving_watermark() {
    let bp = blueprint(5, None);
    let registry = SchemaRegistry::new(&bp.topics).unwrap();
    let transport = Arc::new(MemoryTransport::new());
    let topic = bp.topics.topic_for(RecordKind::Gps);

    send(&transport, topic, 0, &gps_payload(0, "2024-01-01T08:00:00Z")).await;
    let mut missing_speed = gps_payload(1, "2024-01-01T09:00:00Z");
    missing_speed.as_object_mut().unwrap().remove("speed");
    send(&transport, topic, 1, &missing_speed).await;
    send(&transport, topic, 2, &gps_payload(2, "2024-01-01T08:00:30Z")).await;

    let mut reader =
        StreamReader::new(topic, &registry, Arc::clone(&transport), ReaderConfig::default())
            .unwrap();
    let batch = reader.poll().await.unwrap();
    assert_eq!(batch.rejected, 1);
    assert_eq!(batch.end_offset, 3);
    assert_eq!(
        batch.records.iter().map(|r| r.offset).collect::<Vec<_>>(),
        vec![0, 2]
    );
    // The rejected record's later event time never counted
    assert_eq!(
        reader.max_event_time(),
        Some("2024-01-01T08:00:30Z".parse().unwrap())
    );

    let snapshot = reader.metrics().snapshot();
    assert_eq!(snapshot.records_rejected, 1);
    assert_eq!(snapshot.records_ingested, 2);
}

#[tokio::test]
async fn test_late_records_are_persisted_and_flagged() {
    let mut bp = blueprint(5, None);
    bp.ingestion.watermark_delay_secs = 120;
    let transport = Arc::new(MemoryTransport::new());
    let topic = bp.topics.topic_for(RecordKind::Gps).to_string();

    send(&transport, &topic, 0, &gps_payload(0, "2024-01-01T08:10:00Z")).await;
    // Within the allowed delay
    send(&transport, &topic, 1, &gps_payload(1, "2024-01-01T08:09:00Z")).await;
    // Behind the watermark (08:08:00)
    send(&transport, &topic, 2, &gps_payload(2, "2024-01-01T08:05:00Z")).await;
    send(&transport, &topic, 3, &json!({"id": "not-json-enough"})).await;

    let store = Arc::new(MemoryObjectStore::new());
    let results = persist_all(&bp, &transport, &store).await;
    let summary = results[&topic].as_ref().unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.late_records, 1);
    assert_eq!(summary.rejected_records, 1);
    assert_eq!(summary.next_offset, 4);

    let mut flags = Vec::new();
    for path in committed_files(&store, &topic).await {
        for batch in read_parquet(&store, &path).await {
            let offsets = batch
                .column_by_name(OFFSET_COLUMN)
                .unwrap()
                .as_primitive::<UInt64Type>();
            let late = batch.column_by_name(LATE_COLUMN).unwrap().as_boolean();
            for row in 0..batch.num_rows() {
                flags.push((offsets.value(row), late.value(row)));
            }
        }
    }
    flags.sort_unstable();
    assert_eq!(flags, vec![(0, false), (1, false), (2, true)]);
}

#[tokio::test]
async fn test_file_log_decouples_producer_and_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let bp = blueprint(3, Some(6));

    // Producer side
    {
        let producer = Arc::new(FileLogTransport::open(dir.path()).await.unwrap());
        let generator = EventGenerator::from_config(&bp.simulation, bp.vehicle.clone());
        let journey = simulator::Journey::new(
            simulator::JourneyConfig::from_blueprint(&bp),
            generator,
            producer,
        );
        let (_tx, rx) = tokio::sync::watch::channel(false);
        let summary = journey.run(rx).await.unwrap();
        assert_eq!(summary.publish.delivered, 30);
    }

    // Pipeline side, separate transport handle over the same directory
    let consumer = Arc::new(FileLogTransport::open(dir.path()).await.unwrap());
    let registry = SchemaRegistry::new(&bp.topics).unwrap();
    for (kind, topic) in bp.topics.iter() {
        let mut reader =
            StreamReader::new(topic, &registry, Arc::clone(&consumer), ReaderConfig::default())
                .unwrap();
        let batch = reader.poll().await.unwrap();
        assert_eq!(batch.records.len(), 6, "{kind}");
        assert_eq!(batch.rejected, 0, "{kind}");
    }
}

#[tokio::test]
async fn test_two_journeys_append_to_the_same_topics() {
    let bp = blueprint(8, Some(4));
    let transport = Arc::new(MemoryTransport::new());
    publish_journey(&bp, &transport).await;
    publish_journey(&bp, &transport).await;

    for (_, topic) in bp.topics.iter() {
        assert_eq!(transport.topic_len(topic), 8);
    }

    let store = Arc::new(MemoryObjectStore::new());
    let results = persist_all(&bp, &transport, &store).await;
    for (topic, result) in &results {
        let summary = result.as_ref().unwrap();
        // The second journey repeats the first one's event times; late or not,
        // every record is kept
        assert_eq!(summary.records, 8, "{topic}");
        assert_eq!(summary.rejected_records, 0, "{topic}");
    }
}
