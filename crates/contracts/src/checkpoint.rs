//! Checkpoint records for exactly-once persistence
//!
//! Each batch is first planned (offset range recorded), then written, then
//! committed. The newest commit is the checkpoint a restarted sink resumes from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Offset range claimed by a batch before any data is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub topic: String,
    pub batch_id: u64,
    /// First offset of the batch
    pub start_offset: u64,
    /// One past the last offset of the batch
    pub end_offset: u64,
    pub planned_at: DateTime<Utc>,
}

impl BatchPlan {
    pub fn len(&self) -> u64 {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Durable marker of a committed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub topic: String,
    pub batch_id: u64,
    /// Next transport offset to read
    pub next_offset: u64,
    /// Largest event time seen so far, `None` before the first valid record
    pub max_event_time: Option<DateTime<Utc>>,
    /// Watermark in force after the batch
    pub watermark: Option<DateTime<Utc>>,
    /// Data files written by this batch
    pub files: Vec<String>,
    pub records: u64,
    pub late_records: u64,
    pub rejected_records: u64,
    pub committed_at: DateTime<Utc>,
}
