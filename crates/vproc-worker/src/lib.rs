//! Video ingestion and transcoding worker.
//!
//! This crate provides:
//! - The job orchestrator (fetch, probe, fan-out, aggregate, cleanup)
//! - Rendition and audio tasks with bounded FFmpeg concurrency
//! - The bus consumer loop with graceful shutdown
//! - Structured job logging and metrics

pub mod cleanup;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod renditions;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, MessageOutcome};
pub use logging::{JobLogger, JobPhase};
pub use processor::{JobProcessor, ProcessingContext};
