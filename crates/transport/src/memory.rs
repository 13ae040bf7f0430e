//! In-process transport
//!
//! Cloning shares the underlying topic logs, so a producer and any number of
//! readers in the same process can hold their own handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{ContractError, DeliveryReport, OutboundMessage, Transport, TransportMessage};
use tracing::trace;

#[derive(Debug, Clone)]
struct StoredMessage {
    key: String,
    payload: Bytes,
}

#[derive(Debug, Default)]
struct Inner {
    topics: Mutex<HashMap<String, Vec<StoredMessage>>>,
    /// Number of upcoming sends to reject
    failing_sends: AtomicU64,
    /// Number of upcoming fetches to reject
    failing_fetches: AtomicU64,
}

/// Shared in-memory topic logs
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` sends with a transport error
    pub fn fail_next_sends(&self, count: u64) {
        self.inner.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Reject the next `count` fetches with a transport error
    pub fn fail_next_fetches(&self, count: u64) {
        self.inner.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Number of messages appended to `topic`
    pub fn topic_len(&self, topic: &str) -> u64 {
        self.inner
            .topics
            .lock()
            .map(|topics| topics.get(topic).map_or(0, |log| log.len() as u64))
            .unwrap_or(0)
    }

    fn take_injected_failure(counter: &AtomicU64) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn poisoned(&self) -> ContractError {
        ContractError::transport("memory", "topic log lock poisoned")
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: OutboundMessage) -> Result<DeliveryReport, ContractError> {
        if Self::take_injected_failure(&self.inner.failing_sends) {
            return Err(ContractError::transport(
                "memory",
                format!("injected send failure on '{}'", message.topic),
            ));
        }

        let mut topics = self.inner.topics.lock().map_err(|_| self.poisoned())?;
        let log = topics.entry(message.topic.clone()).or_default();
        let offset = log.len() as u64;
        log.push(StoredMessage {
            key: message.key,
            payload: message.payload,
        });
        trace!(topic = %message.topic, offset, "appended");

        Ok(DeliveryReport {
            topic: message.topic,
            offset,
        })
    }

    async fn fetch(
        &self,
        topic: &str,
        from_offset: u64,
        max_messages: usize,
    ) -> Result<Vec<TransportMessage>, ContractError> {
        if Self::take_injected_failure(&self.inner.failing_fetches) {
            return Err(ContractError::transport(
                "memory",
                format!("injected fetch failure on '{topic}'"),
            ));
        }

        let topics = self.inner.topics.lock().map_err(|_| self.poisoned())?;
        let Some(log) = topics.get(topic) else {
            return Ok(Vec::new());
        };

        let start = usize::try_from(from_offset).unwrap_or(usize::MAX);
        Ok(log
            .iter()
            .enumerate()
            .skip(start)
            .take(max_messages)
            .map(|(offset, msg)| TransportMessage {
                topic: topic.to_string(),
                offset: offset as u64,
                key: Some(msg.key.clone()),
                payload: msg.payload.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str, n: u32) -> OutboundMessage {
        OutboundMessage {
            topic: topic.to_string(),
            key: format!("k{n}"),
            payload: Bytes::from(format!("{{\"n\":{n}}}")),
        }
    }

    #[tokio::test]
    async fn test_offsets_are_dense_per_topic() {
        let transport = MemoryTransport::new();
        for n in 0..3 {
            let report = transport.send(message("a", n)).await.unwrap();
            assert_eq!(report.offset, n as u64);
        }
        let report = transport.send(message("b", 0)).await.unwrap();
        assert_eq!(report.offset, 0);
        assert_eq!(transport.topic_len("a"), 3);
    }

    #[tokio::test]
    async fn test_fetch_window() {
        let transport = MemoryTransport::new();
        for n in 0..5 {
            transport.send(message("a", n)).await.unwrap();
        }

        let batch = transport.fetch("a", 1, 2).await.unwrap();
        let offsets: Vec<_> = batch.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![1, 2]);
        assert_eq!(batch[0].key.as_deref(), Some("k1"));

        assert!(transport.fetch("a", 5, 10).await.unwrap().is_empty());
        assert!(transport.fetch("missing", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_logs() {
        let producer = MemoryTransport::new();
        let reader = producer.clone();
        producer.send(message("a", 0)).await.unwrap();
        assert_eq!(reader.fetch("a", 0, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let transport = MemoryTransport::new();
        transport.fail_next_sends(2);
        assert!(transport.send(message("a", 0)).await.is_err());
        assert!(transport.send(message("a", 1)).await.is_err());
        let report = transport.send(message("a", 2)).await.unwrap();
        assert_eq!(report.offset, 0);

        transport.fail_next_fetches(1);
        assert!(matches!(
            transport.fetch("a", 0, 10).await,
            Err(ContractError::Transport { .. })
        ));
        assert_eq!(transport.fetch("a", 0, 10).await.unwrap().len(), 1);
    }
}
