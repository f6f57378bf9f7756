//! Structured job logging.
//!
//! Every event emitted through [`JobLogger`] carries the video id as `job_id`,
//! the operation name and, for progress events, the pipeline phase.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn, Span};
use vproc_models::VideoId;

use crate::error::WorkerError;

/// Pipeline phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Fetch,
    Plan,
    Base,
    FanOut,
    Cleanup,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Fetch => "fetch",
            JobPhase::Plan => "plan",
            JobPhase::Base => "base",
            JobPhase::FanOut => "fan_out",
            JobPhase::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger bound to one video job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    video_id: VideoId,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(video_id: &VideoId, operation: &'static str) -> Self {
        Self {
            video_id: *video_id,
            operation,
        }
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The staging object `source` has been picked up.
    pub fn started(&self, source: &str) {
        info!(
            job_id = %self.video_id,
            operation = self.operation,
            source,
            "Job started"
        );
    }

    pub fn phase(&self, phase: JobPhase, message: &str) {
        info!(
            job_id = %self.video_id,
            operation = self.operation,
            phase = phase.as_str(),
            "{}", message
        );
    }

    /// A recoverable problem; the job keeps going.
    pub fn degraded(&self, phase: JobPhase, message: &str) {
        warn!(
            job_id = %self.video_id,
            operation = self.operation,
            phase = phase.as_str(),
            "{}", message
        );
    }

    pub fn finished(&self, elapsed: Duration) {
        info!(
            job_id = %self.video_id,
            operation = self.operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "Job finished"
        );
    }

    pub fn failed(&self, elapsed: Duration, err: &WorkerError) {
        error!(
            job_id = %self.video_id,
            operation = self.operation,
            elapsed_ms = elapsed.as_millis() as u64,
            kind = err.kind(),
            errors = err.entries().len(),
            "Job failed: {}", err
        );
    }

    /// Span wrapping everything done for this job, spawned tasks included.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.video_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_keeps_job_identity() {
        let video_id = VideoId::new();
        let logger = JobLogger::new(&video_id, "process_video");

        assert_eq!(logger.video_id(), &video_id);
        assert_eq!(logger.operation(), "process_video");
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(JobPhase::FanOut.to_string(), "fan_out");
        assert_eq!(JobPhase::Base.as_str(), "base");
    }
}
