//! Reader configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::IngestionConfig;

/// Stream reader configuration
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Upper bound on messages pulled per poll
    pub max_batch_records: usize,

    /// Watermark delay behind the largest event time
    pub watermark_delay: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::from(&IngestionConfig::default())
    }
}

impl From<&IngestionConfig> for ReaderConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            max_batch_records: config.max_batch_records.max(1),
            watermark_delay: Duration::from_secs(config.watermark_delay_secs),
        }
    }
}

/// Reader metrics
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// Messages pulled from the transport
    pub messages_received: AtomicU64,

    /// Records that passed decoding and validation
    pub records_ingested: AtomicU64,

    /// Records rejected by decoding or validation
    pub records_rejected: AtomicU64,

    /// Valid records flagged late
    pub records_late: AtomicU64,

    /// Fetches that failed and were retried
    pub fetch_failures: AtomicU64,
}

impl ReaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self, count: u64) {
        self.messages_received.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_ingested(&self, late: bool) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
        if late {
            self.records_late.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        ReaderSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            records_ingested: self.records_ingested.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_late: self.records_late.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderSnapshot {
    pub messages_received: u64,
    pub records_ingested: u64,
    pub records_rejected: u64,
    pub records_late: u64,
    pub fetch_failures: u64,
}
