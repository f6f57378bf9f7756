//! Kafka job bus.
//!
//! This crate provides:
//! - Topic bootstrap on startup
//! - The [`JobSource`] seam the worker loop reads from
//! - A Kafka consumer ([`JobConsumer`]) and publisher ([`JobPublisher`])
//! - The JSON wire codec for [`vproc_models::VideoJob`]

pub mod codec;
pub mod config;
pub mod consumer;
pub mod error;
pub mod publisher;
pub mod topic;

pub use codec::{decode_job, encode_job};
pub use config::QueueConfig;
pub use consumer::{JobConsumer, JobSource, RawMessage};
pub use error::{QueueError, QueueResult};
pub use publisher::JobPublisher;
pub use topic::ensure_topic;
