//! S3-compatible object storage client.
//!
//! This crate provides:
//! - The [`ObjectStore`] seam used by the worker
//! - An AWS SDK backed implementation ([`S3Client`])
//! - A per-call deadline wrapper ([`TimedStore`])
//! - The deterministic per-video key layout
//! - Public URL construction

pub mod client;
pub mod error;
pub mod keys;
pub mod timed;

pub use client::{ObjectStore, S3Client, S3Config, OCTET_STREAM};
pub use error::{StorageError, StorageResult};
pub use timed::TimedStore;
