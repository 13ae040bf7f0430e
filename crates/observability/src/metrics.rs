//! Telemetry pipeline metrics
//!
//! Thin wrappers over the `metrics` facade, one per pipeline event, plus
//! in-memory aggregation for end-of-run summaries.

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// Record a record handed to the transport
pub fn record_published(topic: &str) {
    counter!("smart_city_records_published_total", "topic" => topic.to_string()).increment(1);
}

/// Record a failed publish (encoding or delivery)
pub fn record_publish_failure(topic: &str) {
    counter!("smart_city_publish_failures_total", "topic" => topic.to_string()).increment(1);
}

/// Record a completed journey step
pub fn record_journey_step(step: u64) {
    counter!("smart_city_journey_steps_total").increment(1);
    gauge!("smart_city_journey_step").set(step as f64);
}

/// Record a failed topic fetch that will be retried
pub fn record_fetch_retry(topic: &str) {
    counter!("smart_city_fetch_retries_total", "topic" => topic.to_string()).increment(1);
}

/// Record a record that passed decoding and validation
pub fn record_ingested(topic: &str) {
    counter!("smart_city_records_ingested_total", "topic" => topic.to_string()).increment(1);
}

/// Record a record rejected by decoding or validation
pub fn record_decode_failure(topic: &str) {
    counter!("smart_city_decode_failures_total", "topic" => topic.to_string()).increment(1);
}

/// Record a record flagged late by the watermark
pub fn record_late(topic: &str) {
    counter!("smart_city_late_records_total", "topic" => topic.to_string()).increment(1);
}

/// Record the current watermark (unix seconds)
pub fn record_watermark(topic: &str, watermark_unix_secs: i64) {
    gauge!("smart_city_watermark_seconds", "topic" => topic.to_string())
        .set(watermark_unix_secs as f64);
}

/// Record a committed batch
pub fn record_batch_committed(topic: &str, records: usize, commit_ms: f64) {
    counter!("smart_city_batches_committed_total", "topic" => topic.to_string()).increment(1);
    histogram!("smart_city_batch_records", "topic" => topic.to_string()).record(records as f64);
    histogram!("smart_city_batch_commit_ms", "topic" => topic.to_string()).record(commit_ms);
}

/// Record a failed batch write that will be retried
pub fn record_sink_retry(topic: &str) {
    counter!("smart_city_sink_retries_total", "topic" => topic.to_string()).increment(1);
}

/// Per-topic aggregation of committed batches
#[derive(Debug, Clone, Default)]
pub struct BatchStatsAggregator {
    /// Batches committed per topic
    pub batches: BTreeMap<String, u64>,

    /// Records persisted per topic
    pub records: BTreeMap<String, u64>,

    /// Commit latency (ms)
    pub commit_ms: RunningStats,

    /// Batch size (records)
    pub batch_size: RunningStats,
}

impl BatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one committed batch
    pub fn update(&mut self, topic: &str, records: usize, commit_ms: f64) {
        *self.batches.entry(topic.to_string()).or_insert(0) += 1;
        *self.records.entry(topic.to_string()).or_insert(0) += records as u64;
        self.commit_ms.push(commit_ms);
        self.batch_size.push(records as f64);
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_batches: self.batches.values().sum(),
            total_records: self.records.values().sum(),
            commit_ms: StatsSummary::from(&self.commit_ms),
            batch_size: StatsSummary::from(&self.batch_size),
            records_per_topic: self.records.clone(),
        }
    }

    /// Merge another aggregator into this one
    pub fn merge(&mut self, other: &BatchStatsAggregator) {
        for (topic, n) in &other.batches {
            *self.batches.entry(topic.clone()).or_insert(0) += n;
        }
        for (topic, n) in &other.records {
            *self.records.entry(topic.clone()).or_insert(0) += n;
        }
        self.commit_ms.merge(&other.commit_ms);
        self.batch_size.merge(&other.batch_size);
    }
}

/// Batch summary
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total_batches: u64,
    pub total_records: u64,
    pub commit_ms: StatsSummary,
    pub batch_size: StatsSummary,
    pub records_per_topic: BTreeMap<String, u64>,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Persistence Summary ===")?;
        writeln!(f, "Batches committed: {}", self.total_batches)?;
        writeln!(f, "Records persisted: {}", self.total_records)?;
        writeln!(f, "Commit latency (ms): {}", self.commit_ms)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;

        if !self.records_per_topic.is_empty() {
            writeln!(f, "Records per topic:")?;
            for (topic, count) in &self.records_per_topic {
                writeln!(f, "  {}: {}", topic, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Combine with another sample set (Chan et al. parallel update)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / count as f64;
        self.m2 += other.m2 + delta * delta * (self.count as f64 * other.count as f64) / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
