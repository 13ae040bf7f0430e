//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single topic sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Committed batches
    batches_committed: AtomicU64,
    /// Rows written to data files
    records_written: AtomicU64,
    /// Rows written with the late flag
    late_records: AtomicU64,
    /// Offsets consumed without a row (failed validation)
    rejected_records: AtomicU64,
    /// Data files written
    files_written: AtomicU64,
    /// Failed write attempts (each one retried)
    write_failures: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Account for a committed batch
    pub fn record_commit(&self, records: u64, late: u64, rejected: u64, files: u64) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records, Ordering::Relaxed);
        self.late_records.fetch_add(late, Ordering::Relaxed);
        self.rejected_records.fetch_add(rejected, Ordering::Relaxed);
        self.files_written.fetch_add(files, Ordering::Relaxed);
    }

    pub fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> SinkSnapshot {
        SinkSnapshot {
            batches_committed: self.batches_committed(),
            records_written: self.records_written(),
            late_records: self.late_records.load(Ordering::Relaxed),
            rejected_records: self.rejected_records.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            write_failures: self.write_failures(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSnapshot {
    pub batches_committed: u64,
    pub records_written: u64,
    pub late_records: u64,
    pub rejected_records: u64,
    pub files_written: u64,
    pub write_failures: u64,
}
