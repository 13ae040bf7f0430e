//! Topic pipeline: pull, validate, batch, persist
//!
//! One pipeline per topic, independent of the others. On start it resumes
//! from the newest commit and replays a planned-but-uncommitted batch over
//! exactly its recorded range before reading anything new.

use std::time::Duration;

use chrono::Utc;
use contracts::{BatchPlan, ContractError, ObjectStore, Transport};
use ingestion::{ReadBatch, StreamReader};
use observability::BatchStatsAggregator;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::control::{sleep_unless_stopped, sleep_until_changed, RunState};
use crate::error::Result;
use crate::sink::{BatchProgress, Committed, PersistenceSink};

/// Why a pipeline returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Caught up with the topic while draining
    Drained,
    /// Stop requested
    Stopped,
}

/// Pipeline run statistics
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub topic: String,
    pub stop_reason: StopReason,
    /// Offset the run started from
    pub resumed_from: u64,
    /// Next offset to read after the run
    pub next_offset: u64,
    /// An uncommitted batch was replayed on start
    pub replayed: bool,
    pub batches: u64,
    pub records: u64,
    pub late_records: u64,
    pub rejected_records: u64,
    pub stats: BatchStatsAggregator,
}

impl PipelineSummary {
    fn new(topic: &str, resumed_from: u64) -> Self {
        Self {
            topic: topic.to_string(),
            stop_reason: StopReason::Stopped,
            resumed_from,
            next_offset: resumed_from,
            replayed: false,
            batches: 0,
            records: 0,
            late_records: 0,
            rejected_records: 0,
            stats: BatchStatsAggregator::new(),
        }
    }

    fn update(&mut self, committed: &Committed) {
        let checkpoint = &committed.checkpoint;
        self.batches += 1;
        self.records += checkpoint.records;
        self.late_records += checkpoint.late_records;
        self.rejected_records += checkpoint.rejected_records;
        self.next_offset = checkpoint.next_offset;
        self.stats
            .update(&self.topic, checkpoint.records as usize, committed.commit_ms);
    }
}

pub struct TopicPipeline<T, S> {
    reader: StreamReader<T>,
    sink: PersistenceSink<S>,
    poll_interval: Duration,
    next_batch_id: u64,
}

impl<T, S> TopicPipeline<T, S>
where
    T: Transport + Sync,
    S: ObjectStore + Sync,
{
    pub fn new(reader: StreamReader<T>, sink: PersistenceSink<S>, poll_interval: Duration) -> Self {
        Self {
            reader,
            sink,
            poll_interval,
            next_batch_id: 0,
        }
    }

    pub fn topic(&self) -> &str {
        self.reader.topic()
    }

    pub fn reader(&self) -> &StreamReader<T> {
        &self.reader
    }

    pub fn sink(&self) -> &PersistenceSink<S> {
        &self.sink
    }

    fn progress(&self) -> BatchProgress {
        BatchProgress {
            max_event_time: self.reader.max_event_time(),
            watermark: self.reader.watermark(),
        }
    }

    fn plan_for(&self, batch: &ReadBatch) -> BatchPlan {
        BatchPlan {
            topic: self.topic().to_string(),
            batch_id: self.next_batch_id,
            start_offset: batch.start_offset,
            end_offset: batch.end_offset,
            planned_at: Utc::now(),
        }
    }

    /// Position the reader at the newest commit
    ///
    /// Returns the plan left uncommitted by the previous run, if any.
    async fn resume(&mut self) -> Result<Option<BatchPlan>> {
        let recovery = self.sink.recover().await?;

        if let Some(checkpoint) = &recovery.latest {
            self.reader.seek(checkpoint.next_offset);
            self.reader.restore_watermark(checkpoint.max_event_time);
            self.next_batch_id = checkpoint.batch_id + 1;
            info!(
                topic = %self.topic(),
                batch_id = checkpoint.batch_id,
                next_offset = checkpoint.next_offset,
                "resuming from checkpoint"
            );
        }

        if let Some(plan) = &recovery.pending {
            if plan.batch_id != self.next_batch_id || plan.start_offset != self.reader.position() {
                return Err(ContractError::checkpoint(
                    self.topic(),
                    format!(
                        "uncommitted batch {} [{}, {}) does not follow the last commit (next batch {}, offset {})",
                        plan.batch_id,
                        plan.start_offset,
                        plan.end_offset,
                        self.next_batch_id,
                        self.reader.position()
                    ),
                )
                .into());
            }
        }

        Ok(recovery.pending)
    }

    /// Poll, or re-read `range` when given, retrying transport faults
    ///
    /// Returns `None` if a stop was requested while backing off. The reader
    /// position is unchanged by a failed attempt.
    async fn read_with_retry(
        &mut self,
        range: Option<(u64, u64)>,
        control: &mut watch::Receiver<RunState>,
    ) -> Result<Option<ReadBatch>> {
        let retry = self.sink.retry_policy();
        let mut attempt = 0u32;
        loop {
            let result = match range {
                Some((start, end)) => self.reader.read_range(start, end).await,
                None => self.reader.poll().await,
            };
            match result {
                Ok(batch) => return Ok(Some(batch)),
                Err(e) if e.is_transient() => {
                    self.reader.metrics().record_fetch_failure();
                    observability::record_fetch_retry(self.topic());
                    let delay = retry.delay(attempt);
                    warn!(
                        topic = %self.topic(),
                        offset = self.reader.position(),
                        attempt = attempt + 1,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "fetch failed"
                    );
                    if sleep_unless_stopped(delay, control).await {
                        return Ok(None);
                    }
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Persist a batch; false if stopped before it committed
    async fn commit(
        &mut self,
        plan: &BatchPlan,
        batch: &ReadBatch,
        control: &mut watch::Receiver<RunState>,
        summary: &mut PipelineSummary,
    ) -> Result<bool> {
        let progress = self.progress();
        match self
            .sink
            .persist_with_retry(plan, batch, progress, control)
            .await?
        {
            Some(committed) => {
                summary.update(&committed);
                self.next_batch_id = plan.batch_id + 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run until drained or stopped
    #[instrument(name = "topic_pipeline_run", skip(self, control), fields(topic = %self.topic()))]
    pub async fn run(mut self, mut control: watch::Receiver<RunState>) -> Result<PipelineSummary> {
        let pending = self.resume().await?;
        let mut summary = PipelineSummary::new(self.topic(), self.reader.position());

        if let Some(plan) = pending {
            info!(
                topic = %self.topic(),
                batch_id = plan.batch_id,
                start = plan.start_offset,
                end = plan.end_offset,
                "replaying uncommitted batch"
            );
            let range = Some((plan.start_offset, plan.end_offset));
            let Some(batch) = self.read_with_retry(range, &mut control).await? else {
                return Ok(summary);
            };
            summary.replayed = true;
            if !self.commit(&plan, &batch, &mut control, &mut summary).await? {
                return Ok(summary);
            }
        }

        loop {
            let state = *control.borrow();
            if state == RunState::Stop {
                summary.stop_reason = StopReason::Stopped;
                break;
            }

            let Some(batch) = self.read_with_retry(None, &mut control).await? else {
                summary.stop_reason = StopReason::Stopped;
                break;
            };
            if batch.is_empty() {
                if state == RunState::Drain {
                    summary.stop_reason = StopReason::Drained;
                    break;
                }
                if !sleep_until_changed(self.poll_interval, &mut control).await {
                    debug!(topic = %self.topic(), "control channel closed");
                    summary.stop_reason = StopReason::Stopped;
                    break;
                }
                continue;
            }

            let plan = self.plan_for(&batch);
            if !self.commit(&plan, &batch, &mut control, &mut summary).await? {
                summary.stop_reason = StopReason::Stopped;
                break;
            }
        }

        info!(
            topic = %summary.topic,
            reason = ?summary.stop_reason,
            batches = summary.batches,
            records = summary.records,
            next_offset = summary.next_offset,
            "pipeline finished"
        );
        Ok(summary)
    }
}
