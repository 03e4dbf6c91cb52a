//! Aggregate run accounting.
//!
//! This module defines the `PipelineRunSummary` built incrementally while
//! the orchestrator iterates samples and emitted once at the end of the
//! run, including the per-sample failure report.

use crate::domain::SampleRecord;
use std::fmt;

/// One failed sample and its captured error string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFailure {
    /// Identifier of the failed sample.
    pub sample_id: String,
    /// The error message captured at the sample boundary.
    pub error: String,
}

/// Final accounting for one batch run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunSummary {
    /// The total number of samples attempted.
    pub total: usize,
    /// The number of samples that reached the annotated state.
    pub succeeded: usize,
    /// Every failed sample with its captured error, in discovery order.
    pub failed: Vec<SampleFailure>,
}

impl PipelineRunSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one finished sample record into the summary.
    ///
    /// # Arguments
    ///
    /// * `record` - A record in a terminal state.
    pub fn record(&mut self, record: &SampleRecord) {
        self.total += 1;
        if record.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed.push(SampleFailure {
                sample_id: record.sample_id.clone(),
                error: record
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for PipelineRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Run Summary:")?;
        writeln!(f, "  Total samples: {}", self.total)?;
        writeln!(
            f,
            "  Succeeded: {} ({:.1}%)",
            self.succeeded,
            self.success_rate()
        )?;
        writeln!(f, "  Failed: {}", self.failed.len())?;
        for failure in &self.failed {
            writeln!(f, "    {}: {}", failure.sample_id, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineRunSummary;
    use crate::domain::SampleRecord;

    fn annotated(id: &str) -> SampleRecord {
        let mut record = SampleRecord::pending(id, "/in", "/out");
        record.mark_segmented();
        record.mark_annotated();
        record
    }

    fn failed(id: &str, error: &str) -> SampleRecord {
        let mut record = SampleRecord::pending(id, "/in", "/out");
        record.mark_failed(error);
        record
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = PipelineRunSummary::new();
        summary.record(&annotated("s1"));
        summary.record(&failed("s2", "geometry: cannot locate channel axis"));
        summary.record(&annotated("s3"));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].sample_id, "s2");
    }

    #[test]
    fn success_rate_handles_empty_run() {
        assert_eq!(PipelineRunSummary::new().success_rate(), 0.0);
    }

    #[test]
    fn display_lists_failures() {
        let mut summary = PipelineRunSummary::new();
        summary.record(&annotated("s1"));
        summary.record(&failed("s2", "configuration: no configuration file"));

        let text = summary.to_string();
        assert!(text.contains("Total samples: 2"));
        assert!(text.contains("Succeeded: 1 (50.0%)"));
        assert!(text.contains("Failed: 1"));
        assert!(text.contains("s2: configuration: no configuration file"));
    }
}
