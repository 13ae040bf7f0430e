//! Per-topic stream reader
//!
//! Pulls messages from the transport in offset order, decodes and validates
//! each against the topic schema, and assigns watermark status to the valid
//! ones. Bad records are logged, counted and skipped; they never move the
//! watermark and never stop the reader.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::{ContractError, IngestedRecord, Schema, Transport, TransportMessage};
use schema_registry::{decode_payload, SchemaRegistry};
use tracing::{debug, instrument, trace, warn};

use crate::config::{ReaderConfig, ReaderMetrics};
use crate::error::{IngestionError, Result};
use crate::watermark::WatermarkTracker;

/// Result of one poll: the offset range consumed and what survived validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadBatch {
    /// First offset consumed
    pub start_offset: u64,
    /// One past the last offset consumed
    pub end_offset: u64,
    pub records: Vec<IngestedRecord>,
    /// Messages in the range that failed decoding or validation
    pub rejected: u64,
}

impl ReadBatch {
    /// No offsets were consumed
    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }

    pub fn late_count(&self) -> u64 {
        self.records.iter().filter(|r| r.late).count() as u64
    }
}

/// Reads one topic
pub struct StreamReader<T> {
    topic: String,
    schema: Arc<Schema>,
    transport: Arc<T>,
    config: ReaderConfig,
    position: u64,
    watermark: WatermarkTracker,
    metrics: Arc<ReaderMetrics>,
}

impl<T: Transport + Sync> StreamReader<T> {
    /// Reader positioned at the earliest offset
    ///
    /// Fails if the registry has no schema for `topic`.
    pub fn new(
        topic: impl Into<String>,
        registry: &SchemaRegistry,
        transport: Arc<T>,
        config: ReaderConfig,
    ) -> Result<Self> {
        let topic = topic.into();
        let schema = registry.schema_for(&topic)?;
        let watermark = WatermarkTracker::new(config.watermark_delay);
        Ok(Self {
            topic,
            schema,
            transport,
            config,
            position: 0,
            watermark,
            metrics: Arc::new(ReaderMetrics::new()),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn metrics(&self) -> &Arc<ReaderMetrics> {
        &self.metrics
    }

    /// Next offset to read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Continue from `offset`
    pub fn seek(&mut self, offset: u64) {
        debug!(topic = %self.topic, offset, "seek");
        self.position = offset;
    }

    /// Resume watermark tracking from a checkpointed maximum event time
    pub fn restore_watermark(&mut self, max_event_time: Option<DateTime<Utc>>) {
        self.watermark.restore(max_event_time);
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark.watermark()
    }

    pub fn max_event_time(&self) -> Option<DateTime<Utc>> {
        self.watermark.max_event_time()
    }

    /// Pull up to `max_batch_records` messages from the current position
    #[instrument(name = "stream_reader_poll", skip(self), fields(topic = %self.topic, from = self.position))]
    pub async fn poll(&mut self) -> Result<ReadBatch> {
        let messages = self
            .transport
            .fetch(&self.topic, self.position, self.config.max_batch_records)
            .await?;

        let mut batch = ReadBatch {
            start_offset: self.position,
            end_offset: self.position,
            ..Default::default()
        };
        self.consume(messages, &mut batch);
        Ok(batch)
    }

    /// Re-read exactly `[start, end)`, as needed to replay a planned batch
    ///
    /// Watermark state must already be restored to what it was when the range
    /// was first read, so late flags come out the same. On error the position
    /// and watermark are left as they were before the call.
    #[instrument(name = "stream_reader_read_range", skip(self), fields(topic = %self.topic))]
    pub async fn read_range(&mut self, start: u64, end: u64) -> Result<ReadBatch> {
        let position = self.position;
        let watermark = self.watermark.clone();

        let result = self.fill_range(start, end).await;
        if result.is_err() {
            self.position = position;
            self.watermark = watermark;
        }
        result
    }

    async fn fill_range(&mut self, start: u64, end: u64) -> Result<ReadBatch> {
        self.position = start;
        let mut batch = ReadBatch {
            start_offset: start,
            end_offset: start,
            ..Default::default()
        };

        while self.position < end {
            let remaining = usize::try_from(end - self.position).unwrap_or(usize::MAX);
            let messages = self
                .transport
                .fetch(
                    &self.topic,
                    self.position,
                    remaining.min(self.config.max_batch_records),
                )
                .await?;

            if messages.is_empty() {
                return Err(IngestionError::RangeUnavailable {
                    topic: self.topic.clone(),
                    start,
                    end,
                    available: self.position,
                });
            }
            self.consume(messages, &mut batch);
        }

        Ok(batch)
    }

    fn consume(&mut self, messages: Vec<TransportMessage>, batch: &mut ReadBatch) {
        self.metrics.record_received(messages.len() as u64);

        for message in messages {
            let offset = message.offset;
            match self.ingest(message) {
                Some(record) => batch.records.push(record),
                None => batch.rejected += 1,
            }
            self.position = offset + 1;
            batch.end_offset = self.position;
        }

        if let Some(watermark) = self.watermark.watermark() {
            observability::record_watermark(&self.topic, watermark.timestamp());
        }
    }

    fn ingest(&mut self, message: TransportMessage) -> Option<IngestedRecord> {
        let row = match decode_payload(&self.schema, &message.payload) {
            Ok(row) => row,
            Err(e) => {
                self.reject(message.offset, &e);
                return None;
            }
        };

        let Some(event_time) = row.event_time(&self.schema) else {
            let error = ContractError::decode_validation(&self.topic, "event time is not a timestamp");
            self.reject(message.offset, &error);
            return None;
        };
        let late = self.watermark.observe(event_time);

        self.metrics.record_ingested(late);
        observability::record_ingested(&self.topic);
        if late {
            observability::record_late(&self.topic);
            debug!(
                topic = %self.topic,
                offset = message.offset,
                event_time = %event_time,
                watermark = ?self.watermark.watermark(),
                "late record"
            );
        }
        trace!(topic = %self.topic, offset = message.offset, "record ingested");

        Some(IngestedRecord {
            offset: message.offset,
            event_time,
            row,
            late,
        })
    }

    fn reject(&self, offset: u64, error: &ContractError) {
        self.metrics.record_rejected();
        observability::record_decode_failure(&self.topic);
        warn!(topic = %self.topic, offset, error = %error, "record rejected");
    }
}
