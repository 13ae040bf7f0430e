//! Exactly-once Parquet sink for one topic
//!
//! Every batch goes through plan, write, commit:
//!
//! 1. the offset range is written to `offsets/<batch>.json`
//! 2. data files are written under names derived from the batch id
//! 3. the checkpoint is written to `commits/<batch>.json`
//!
//! A batch that fails at any step is not committed and is retried as a whole.
//! Rewriting a batch overwrites its files instead of adding new ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use contracts::{BatchPlan, Checkpoint, ContractError, ObjectStore, Schema, StorageConfig};
use ingestion::ReadBatch;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::CheckpointStore;
use crate::columnar::{part_file_name, partition_dir, partition_records, ParquetEncoder};
use crate::control::{sleep_unless_stopped, RunState};
use crate::error::{PersistenceError, Result};
use crate::metrics::SinkMetrics;

/// Capped exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for RetryPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.retry_initial_backoff_ms),
            max: Duration::from_millis(config.retry_max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Watermark state after a batch, stored in its checkpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub max_event_time: Option<DateTime<Utc>>,
    pub watermark: Option<DateTime<Utc>>,
}

/// A committed batch and how long its successful attempt took
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub checkpoint: Checkpoint,
    pub commit_ms: f64,
}

/// Checkpoint state found at startup
#[derive(Debug, Clone, Default)]
pub struct Recovery {
    pub latest: Option<Checkpoint>,
    /// Planned but uncommitted batch to replay
    pub pending: Option<BatchPlan>,
}

pub struct PersistenceSink<S> {
    topic: String,
    store: Arc<S>,
    checkpoints: CheckpointStore<S>,
    encoder: ParquetEncoder,
    retry: RetryPolicy,
    metrics: Arc<SinkMetrics>,
}

impl<S: ObjectStore + Sync> PersistenceSink<S> {
    pub fn new(schema: Arc<Schema>, store: Arc<S>, config: &StorageConfig) -> Self {
        let topic = schema.topic().to_string();
        Self {
            checkpoints: CheckpointStore::new(Arc::clone(&store), topic.clone()),
            encoder: ParquetEncoder::new(schema, config.compression),
            retry: RetryPolicy::from(config),
            metrics: Arc::new(SinkMetrics::new()),
            topic,
            store,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    pub fn checkpoints(&self) -> &CheckpointStore<S> {
        &self.checkpoints
    }

    /// Load the newest commit and any plan left uncommitted after it
    pub async fn recover(&self) -> Result<Recovery> {
        let latest = self.checkpoints.latest_commit().await?;
        let pending = self.checkpoints.pending_plan(latest.as_ref()).await?;
        Ok(Recovery { latest, pending })
    }

    /// Encode and store the data files of one batch, one file per partition
    async fn write_files(&self, plan: &BatchPlan, batch: &ReadBatch) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for (seq, group) in partition_records(&batch.records).into_values().enumerate() {
            let Some(first) = group.first() else {
                continue;
            };
            let path = format!(
                "{}/{}",
                partition_dir(&self.topic, first.event_time),
                part_file_name(plan.batch_id, seq)
            );
            let data = self
                .encoder
                .encode(&group)
                .map_err(|e| PersistenceError::encode(&self.topic, plan.batch_id, e))?;
            self.store
                .put(&path, data)
                .await
                .map_err(|e| ContractError::sink_write(&self.topic, e.to_string()))?;
            debug!(topic = %self.topic, path = %path, rows = group.len(), "data file written");
            files.push(path);
        }
        Ok(files)
    }

    /// One attempt at plan, write, commit
    #[instrument(
        name = "persistence_sink_persist",
        skip(self, plan, batch, progress),
        fields(topic = %self.topic, batch_id = plan.batch_id, start = plan.start_offset, end = plan.end_offset)
    )]
    pub async fn persist(
        &self,
        plan: &BatchPlan,
        batch: &ReadBatch,
        progress: BatchProgress,
    ) -> Result<Committed> {
        let started = Instant::now();

        self.checkpoints.write_plan(plan).await?;
        let files = self.write_files(plan, batch).await?;

        let checkpoint = Checkpoint {
            topic: self.topic.clone(),
            batch_id: plan.batch_id,
            next_offset: plan.end_offset,
            max_event_time: progress.max_event_time,
            watermark: progress.watermark,
            files,
            records: batch.records.len() as u64,
            late_records: batch.late_count(),
            rejected_records: batch.rejected,
            committed_at: Utc::now(),
        };
        self.checkpoints.commit(&checkpoint).await?;

        let commit_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_commit(
            checkpoint.records,
            checkpoint.late_records,
            checkpoint.rejected_records,
            checkpoint.files.len() as u64,
        );
        observability::record_batch_committed(&self.topic, batch.records.len(), commit_ms);
        debug!(
            topic = %self.topic,
            batch_id = plan.batch_id,
            records = checkpoint.records,
            files = checkpoint.files.len(),
            commit_ms,
            "batch committed"
        );

        Ok(Committed {
            checkpoint,
            commit_ms,
        })
    }

    /// Persist a batch, retrying storage failures until success or stop
    ///
    /// Returns `None` if a stop was requested before the batch committed; the
    /// last committed checkpoint is then untouched. Encoding and checkpoint
    /// serialization failures are not retried.
    pub async fn persist_with_retry(
        &self,
        plan: &BatchPlan,
        batch: &ReadBatch,
        progress: BatchProgress,
        control: &mut watch::Receiver<RunState>,
    ) -> Result<Option<Committed>> {
        let mut attempt = 0u32;
        loop {
            match self.persist(plan, batch, progress).await {
                Ok(committed) => {
                    if attempt > 0 {
                        info!(
                            topic = %self.topic,
                            batch_id = plan.batch_id,
                            attempts = attempt + 1,
                            "batch committed after retry"
                        );
                    }
                    return Ok(Some(committed));
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    self.metrics.inc_write_failures();
                    observability::record_sink_retry(&self.topic);
                    let delay = self.retry.delay(attempt);
                    warn!(
                        topic = %self.topic,
                        batch_id = plan.batch_id,
                        attempt = attempt + 1,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "batch write failed"
                    );
                    if sleep_unless_stopped(delay, control).await {
                        warn!(topic = %self.topic, batch_id = plan.batch_id, "stop requested, batch left uncommitted");
                        return Ok(None);
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
