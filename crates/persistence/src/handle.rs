//! PipelineHandle - a topic pipeline running on its own task

use std::sync::Arc;

use contracts::{ObjectStore, Transport};
use ingestion::ReaderMetrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::control::RunState;
use crate::error::{PersistenceError, Result};
use crate::metrics::SinkMetrics;
use crate::pipeline::{PipelineSummary, TopicPipeline};

/// Handle to a running pipeline task
pub struct PipelineHandle {
    topic: String,
    reader_metrics: Arc<ReaderMetrics>,
    sink_metrics: Arc<SinkMetrics>,
    task: JoinHandle<Result<PipelineSummary>>,
}

impl PipelineHandle {
    /// Spawn the pipeline on the runtime
    pub fn spawn<T, S>(pipeline: TopicPipeline<T, S>, control: watch::Receiver<RunState>) -> Self
    where
        T: Transport + Sync + 'static,
        S: ObjectStore + Sync + 'static,
    {
        let topic = pipeline.topic().to_string();
        let reader_metrics = Arc::clone(pipeline.reader().metrics());
        let sink_metrics = Arc::clone(pipeline.sink().metrics());
        let task = tokio::spawn(pipeline.run(control));
        debug!(topic = %topic, "pipeline spawned");

        Self {
            topic,
            reader_metrics,
            sink_metrics,
            task,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn reader_metrics(&self) -> &Arc<ReaderMetrics> {
        &self.reader_metrics
    }

    pub fn sink_metrics(&self) -> &Arc<SinkMetrics> {
        &self.sink_metrics
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the pipeline to return
    #[instrument(name = "pipeline_handle_join", skip(self), fields(topic = %self.topic))]
    pub async fn join(self) -> Result<PipelineSummary> {
        match self.task.await {
            Ok(result) => {
                if let Err(e) = &result {
                    error!(topic = %self.topic, error = %e, "pipeline failed");
                }
                result
            }
            Err(e) => {
                error!(topic = %self.topic, error = ?e, "pipeline task panicked");
                Err(PersistenceError::TaskFailed {
                    topic: self.topic,
                    message: e.to_string(),
                })
            }
        }
    }
}
