//! Job consumer.

use async_trait::async_trait;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::ClientConfig;
use tracing::info;

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};

/// A message as read from the bus, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub offset: i64,
}

impl RawMessage {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: None,
            payload: payload.into(),
            offset: 0,
        }
    }
}

/// Source of job messages for the worker loop.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Wait for the next message. The offset is committed once read.
    async fn recv(&self) -> QueueResult<RawMessage>;
}

/// Kafka consumer-group reader.
pub struct JobConsumer {
    consumer: StreamConsumer,
}

impl JobConsumer {
    /// Join the consumer group and subscribe to the job topic.
    pub fn new(config: &QueueConfig) -> QueueResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "10000")
            .set_log_level(RDKafkaLogLevel::Warning)
            .create()
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        consumer.subscribe(&[config.topic.as_str()])?;

        info!(
            "Kafka consumer joined group {} on {} topic {}",
            config.group, config.brokers, config.topic
        );
        Ok(Self { consumer })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(&QueueConfig::from_env())
    }
}

#[async_trait]
impl JobSource for JobConsumer {
    async fn recv(&self) -> QueueResult<RawMessage> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| QueueError::receive_failed(e.to_string()))?;

        Ok(RawMessage {
            key: message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            offset: message.offset(),
        })
    }
}
