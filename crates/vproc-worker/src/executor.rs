//! Job executor.
//!
//! Reads job messages one at a time and hands each to the processor. A job
//! finishes before the next message is read. Failures are logged and the
//! loop moves on; the offset has already advanced.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use vproc_queue::{decode_job, JobSource, RawMessage};

use crate::metrics;
use crate::processor::JobProcessor;

/// What happened to one bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Processed,
    Failed,
    Skipped,
}

/// Consumer loop feeding the processor.
pub struct JobExecutor {
    source: Arc<dyn JobSource>,
    processor: JobProcessor,
    read_error_backoff: Duration,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(source: Arc<dyn JobSource>, processor: JobProcessor) -> Self {
        let read_error_backoff = processor.context().config.read_error_backoff;
        let (shutdown, _) = watch::channel(false);

        Self {
            source,
            processor,
            read_error_backoff,
            shutdown,
        }
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) {
        info!("Starting job executor");

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {}
                received = self.source.recv() => match received {
                    Ok(message) => {
                        self.handle_message(message).await;
                    }
                    Err(e) => {
                        error!("Failed to read from bus: {}", e);
                        metrics::record_bus_error("read");
                        tokio::time::sleep(self.read_error_backoff).await;
                    }
                },
            }
        }

        info!("Job executor stopped");
    }

    /// Decode and process one message.
    pub async fn handle_message(&self, message: RawMessage) -> MessageOutcome {
        let job = match decode_job(&message.payload) {
            Ok(job) => job,
            Err(e) => {
                warn!(
                    offset = message.offset,
                    key = ?message.key,
                    "Skipping malformed job message: {}", e
                );
                metrics::record_bus_error("decode");
                return MessageOutcome::Skipped;
            }
        };

        info!(video_id = %job.video_id, offset = message.offset, "Received job");

        match self.processor.process(&job).await {
            Ok(()) => {
                info!(video_id = %job.video_id, "Job completed successfully");
                MessageOutcome::Processed
            }
            Err(_) => {
                warn!(
                    video_id = %job.video_id,
                    offset = message.offset,
                    "Moving past failed job"
                );
                MessageOutcome::Failed
            }
        }
    }

    /// Ask the loop to stop after the current job.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
