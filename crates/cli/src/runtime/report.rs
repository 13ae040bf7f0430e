//! End-of-run persistence report.

use observability::BatchStatsAggregator;
use persistence::{PersistenceError, PipelineSummary, StopReason};

use crate::error::{CliError, Result};

/// Outcome of every topic pipeline
#[derive(Debug)]
pub struct IngestReport {
    results: Vec<(String, std::result::Result<PipelineSummary, PersistenceError>)>,
}

impl IngestReport {
    pub fn new(results: Vec<(String, std::result::Result<PipelineSummary, PersistenceError>)>) -> Self {
        Self { results }
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    /// Batch statistics merged over every topic that returned
    pub fn merged_stats(&self) -> BatchStatsAggregator {
        let mut merged = BatchStatsAggregator::new();
        for summary in self.results.iter().filter_map(|(_, r)| r.as_ref().ok()) {
            merged.merge(&summary.stats);
        }
        merged
    }

    pub fn print_summary(&self) {
        println!("\n=== Topic Pipelines ===");
        for (topic, result) in &self.results {
            match result {
                Ok(summary) => {
                    let reason = match summary.stop_reason {
                        StopReason::Drained => "drained",
                        StopReason::Stopped => "stopped",
                    };
                    println!(
                        "  {topic}: {reason}, offsets {}..{}, {} batches, {} records ({} late), {} rejected{}",
                        summary.resumed_from,
                        summary.next_offset,
                        summary.batches,
                        summary.records,
                        summary.late_records,
                        summary.rejected_records,
                        if summary.replayed { ", replayed pending batch" } else { "" },
                    );
                }
                Err(e) => println!("  {topic}: FAILED: {e}"),
            }
        }
        println!();
        print!("{}", self.merged_stats().summary());
        println!();
    }

    /// Error when any pipeline failed
    pub fn into_result(self) -> Result<()> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(CliError::PipelinesFailed {
                failed,
                total: self.results.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_pipelines_fail_the_report() {
        let report = IngestReport::new(vec![(
            "gps_data".to_string(),
            Err(PersistenceError::TaskFailed {
                topic: "gps_data".into(),
                message: "panicked".into(),
            }),
        )]);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.merged_stats().summary().total_batches, 0);
        assert!(matches!(
            report.into_result(),
            Err(CliError::PipelinesFailed { failed: 1, total: 1 })
        ));
    }

    #[test]
    fn test_empty_report_is_ok() {
        assert!(IngestReport::new(Vec::new()).into_result().is_ok());
    }
}
