//! Worker metrics collection.
//!
//! Provides counters and histograms for job outcomes, failed sub-tasks,
//! produced renditions and bus errors. Recording is a no-op until a
//! recorder is installed.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Jobs processed, by outcome.
    pub const JOBS_TOTAL: &str = "vproc_jobs_total";

    /// Job wall-clock duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "vproc_job_duration_seconds";

    /// Failed sub-tasks, by kind.
    pub const TASK_FAILURES_TOTAL: &str = "vproc_task_failures_total";

    /// Renditions uploaded, by height.
    pub const RENDITIONS_TOTAL: &str = "vproc_renditions_total";

    /// Bus messages that could not be read or decoded.
    pub const BUS_ERRORS_TOTAL: &str = "vproc_bus_errors_total";
}

/// Record a finished job.
pub fn record_job(outcome: &'static str, duration_secs: f64) {
    counter!(names::JOBS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}

/// Record a failed sub-task.
pub fn record_task_failure(kind: &'static str) {
    counter!(names::TASK_FAILURES_TOTAL, "kind" => kind).increment(1);
}

/// Record an uploaded rendition.
pub fn record_rendition(height: u32) {
    counter!(names::RENDITIONS_TOTAL, "height" => height.to_string()).increment(1);
}

/// Record a bus read or decode error.
pub fn record_bus_error(kind: &'static str) {
    counter!(names::BUS_ERRORS_TOTAL, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::JOBS_TOTAL.starts_with("vproc_"));
        assert!(names::TASK_FAILURES_TOTAL.contains("failures"));
        assert!(names::JOB_DURATION_SECONDS.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder() {
        record_job("success", 1.5);
        record_task_failure("transcode");
        record_rendition(720);
        record_bus_error("decode");
    }
}
