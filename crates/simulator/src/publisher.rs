//! Record publisher
//!
//! `publish` encodes synchronously and hands delivery to a detached task.
//! Delivery outcomes are logged and counted by the task itself; callers may
//! await the returned `DeliveryHandle` or drop it. `flush` waits for every
//! outstanding delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{ContractError, DeliveryReport, OutboundMessage, Record, Transport};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, trace};

use crate::error::{Result, SimulatorError};

/// Publisher counters
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Records handed to the transport
    submitted: AtomicU64,
    /// Deliveries acknowledged by the transport
    delivered: AtomicU64,
    /// Encoding or delivery failures
    failed: AtomicU64,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PublisherSnapshot {
        PublisherSnapshot {
            submitted: self.submitted(),
            delivered: self.delivered(),
            failed: self.failed(),
        }
    }
}

/// Snapshot of publisher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherSnapshot {
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Pending delivery of one record
#[derive(Debug)]
pub struct DeliveryHandle {
    topic: String,
    key: String,
    rx: oneshot::Receiver<std::result::Result<DeliveryReport, ContractError>>,
}

impl DeliveryHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the transport's acknowledgement
    pub async fn wait(self) -> Result<DeliveryReport> {
        match self.rx.await {
            Ok(outcome) => outcome.map_err(SimulatorError::from),
            Err(_) => Err(SimulatorError::DeliveryAbandoned {
                topic: self.topic,
                key: self.key,
            }),
        }
    }
}

/// Publishes records to a transport, keyed by record id
pub struct Publisher<T> {
    transport: Arc<T>,
    in_flight: JoinSet<()>,
    metrics: Arc<PublisherMetrics>,
}

impl<T: Transport + Sync + 'static> Publisher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            in_flight: JoinSet::new(),
            metrics: Arc::new(PublisherMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    /// Deliveries not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Encode `record` and start its delivery to `topic`
    ///
    /// Errors here are encoding failures; delivery failures surface through
    /// the returned handle and the logs.
    pub fn publish(&mut self, topic: &str, record: &Record) -> Result<DeliveryHandle> {
        let key = record.id().to_string();
        let payload = record.to_json_bytes().map_err(|e| {
            self.metrics.failed.fetch_add(1, Ordering::Relaxed);
            observability::record_publish_failure(topic);
            SimulatorError::Encode {
                kind: record.kind().to_string(),
                topic: topic.to_string(),
                message: e.to_string(),
            }
        })?;

        let message = OutboundMessage {
            topic: topic.to_string(),
            key: key.clone(),
            payload: Bytes::from(payload),
        };

        let (tx, rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        self.metrics.submitted.fetch_add(1, Ordering::Relaxed);

        self.in_flight.spawn(async move {
            let topic = message.topic.clone();
            let key = message.key.clone();
            let outcome = transport.send(message).await;
            match &outcome {
                Ok(report) => {
                    metrics.delivered.fetch_add(1, Ordering::Relaxed);
                    observability::record_published(&report.topic);
                    trace!(topic = %report.topic, offset = report.offset, key = %key, "delivered");
                }
                Err(e) => {
                    metrics.failed.fetch_add(1, Ordering::Relaxed);
                    observability::record_publish_failure(&topic);
                    error!(topic = %topic, key = %key, error = %e, "delivery failed");
                }
            }
            // Receiver may have been dropped
            let _ = tx.send(outcome);
        });

        Ok(DeliveryHandle {
            topic: topic.to_string(),
            key,
            rx,
        })
    }

    /// Collect finished deliveries without waiting
    pub fn reap(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            if let Err(e) = joined {
                error!(error = ?e, "delivery task panicked");
            }
        }
    }

    /// Wait for all outstanding deliveries
    #[instrument(name = "publisher_flush", skip(self), fields(in_flight = self.in_flight.len()))]
    pub async fn flush(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = ?e, "delivery task panicked");
            }
        }
        debug!(metrics = ?self.metrics.snapshot(), "publisher flushed");
    }
}
