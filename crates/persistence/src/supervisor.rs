//! Supervisor - starts one pipeline per topic and controls them together

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{IngestionConfig, ObjectStore, StorageConfig, Transport};
use ingestion::{ReaderConfig, ReaderSnapshot, StreamReader};
use schema_registry::SchemaRegistry;
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::control::RunState;
use crate::error::Result;
use crate::handle::PipelineHandle;
use crate::metrics::SinkSnapshot;
use crate::pipeline::{PipelineSummary, TopicPipeline};
use crate::sink::{PersistenceSink, RetryPolicy};

/// Builder for creating a Supervisor
pub struct SupervisorBuilder<T, S> {
    registry: Arc<SchemaRegistry>,
    transport: Arc<T>,
    store: Arc<S>,
    ingestion: IngestionConfig,
    storage: StorageConfig,
    retry: Option<RetryPolicy>,
    topics: Vec<String>,
}

impl<T, S> SupervisorBuilder<T, S>
where
    T: Transport + Sync + 'static,
    S: ObjectStore + Sync + 'static,
{
    /// Pipelines for every topic in the registry unless `topics` narrows them
    pub fn new(registry: Arc<SchemaRegistry>, transport: Arc<T>, store: Arc<S>) -> Self {
        Self {
            registry,
            transport,
            store,
            ingestion: IngestionConfig::default(),
            storage: StorageConfig::default(),
            retry: None,
            topics: Vec::new(),
        }
    }

    pub fn ingestion(mut self, config: IngestionConfig) -> Self {
        self.ingestion = config;
        self
    }

    pub fn storage(mut self, config: StorageConfig) -> Self {
        self.storage = config;
        self
    }

    /// Override the backoff derived from the storage config
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn topics<I, N>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Build every pipeline, then start them
    ///
    /// Nothing is spawned if any topic lacks a schema.
    #[instrument(name = "supervisor_builder_build", skip(self))]
    pub fn build(self) -> Result<Supervisor> {
        let topics: Vec<String> = if self.topics.is_empty() {
            self.registry.topics().map(str::to_string).collect()
        } else {
            self.topics.clone()
        };

        let reader_config = ReaderConfig::from(&self.ingestion);
        let poll_interval = Duration::from_millis(self.ingestion.poll_interval_ms);

        let mut pipelines = Vec::with_capacity(topics.len());
        for topic in &topics {
            let reader = StreamReader::new(
                topic.as_str(),
                &self.registry,
                Arc::clone(&self.transport),
                reader_config.clone(),
            )?;
            let mut sink = PersistenceSink::new(
                Arc::clone(reader.schema()),
                Arc::clone(&self.store),
                &self.storage,
            );
            if let Some(retry) = self.retry {
                sink = sink.with_retry(retry);
            }
            pipelines.push(TopicPipeline::new(reader, sink, poll_interval));
        }

        let (control, rx) = watch::channel(RunState::Running);
        let handles = pipelines
            .into_iter()
            .map(|pipeline| PipelineHandle::spawn(pipeline, rx.clone()))
            .collect::<Vec<_>>();
        info!(pipelines = handles.len(), "supervisor started");

        Ok(Supervisor { control, handles })
    }
}

/// Running topic pipelines
pub struct Supervisor {
    control: watch::Sender<RunState>,
    handles: Vec<PipelineHandle>,
}

/// Per-topic metrics
#[derive(Debug, Clone)]
pub struct TopicMetrics {
    pub topic: String,
    pub reader: ReaderSnapshot,
    pub sink: SinkSnapshot,
}

impl Supervisor {
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(PipelineHandle::topic)
    }

    pub fn metrics(&self) -> Vec<TopicMetrics> {
        self.handles
            .iter()
            .map(|h| TopicMetrics {
                topic: h.topic().to_string(),
                reader: h.reader_metrics().snapshot(),
                sink: h.sink_metrics().snapshot(),
            })
            .collect()
    }

    /// Let pipelines finish once they have caught up with their topics
    pub fn drain(&self) {
        info!("draining pipelines");
        self.control.send_replace(RunState::Drain);
    }

    /// Stop pipelines at their next batch boundary
    pub fn stop(&self) {
        info!("stopping pipelines");
        self.control.send_replace(RunState::Stop);
    }

    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(PipelineHandle::is_finished)
    }

    /// Wait for every pipeline, in topic order
    pub async fn wait(self) -> Vec<(String, Result<PipelineSummary>)> {
        let Supervisor { control, handles } = self;
        let results = join_all(handles).await;
        // Keep the sender alive until every pipeline returned
        drop(control);
        results
    }

    /// Wait for every pipeline, stopping them all once `signal` completes
    pub async fn wait_or_stop<F>(self, signal: F) -> Vec<(String, Result<PipelineSummary>)>
    where
        F: Future<Output = ()>,
    {
        let Supervisor { control, handles } = self;
        let joined = join_all(handles);
        tokio::pin!(joined);
        tokio::pin!(signal);

        let results = tokio::select! {
            results = &mut joined => results,
            _ = &mut signal => {
                info!("stop signal received");
                control.send_replace(RunState::Stop);
                joined.await
            }
        };
        drop(control);
        results
    }
}

async fn join_all(handles: Vec<PipelineHandle>) -> Vec<(String, Result<PipelineSummary>)> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let topic = handle.topic().to_string();
        results.push((topic, handle.join().await));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;
    use crate::pipeline::StopReason;
    use transport::MemoryTransport;

    #[tokio::test]
    async fn test_unknown_topic_fails_build() {
        let registry = Arc::new(SchemaRegistry::with_default_topics().unwrap());
        let result = SupervisorBuilder::new(
            registry,
            Arc::new(MemoryTransport::new()),
            Arc::new(MemoryObjectStore::new()),
        )
        .topics(["gps_data", "unknown"])
        .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_drain_empty_topics() {
        let registry = Arc::new(SchemaRegistry::with_default_topics().unwrap());
        let supervisor = SupervisorBuilder::new(
            registry,
            Arc::new(MemoryTransport::new()),
            Arc::new(MemoryObjectStore::new()),
        )
        .build()
        .unwrap();

        assert_eq!(supervisor.topics().count(), 5);
        supervisor.drain();
        let results = supervisor.wait().await;
        assert_eq!(results.len(), 5);
        for (_, result) in results {
            assert_eq!(result.unwrap().stop_reason, StopReason::Drained);
        }
    }

    #[tokio::test]
    async fn test_wait_or_stop_stops_idle_pipelines() {
        let registry = Arc::new(SchemaRegistry::with_default_topics().unwrap());
        let supervisor = SupervisorBuilder::new(
            registry,
            Arc::new(MemoryTransport::new()),
            Arc::new(MemoryObjectStore::new()),
        )
        .topics(["gps_data", "weather_data"])
        .build()
        .unwrap();

        let results = supervisor.wait_or_stop(std::future::ready(())).await;
        assert_eq!(results.len(), 2);
        for (_, result) in results {
            assert_eq!(result.unwrap().stop_reason, StopReason::Stopped);
        }
    }
}
