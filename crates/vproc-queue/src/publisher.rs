//! Job publisher.

use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use tracing::{debug, info};

use vproc_models::VideoJob;

use crate::codec::encode_job;
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};

/// Publishes upload jobs, waiting for every in-sync replica.
#[derive(Clone)]
pub struct JobPublisher {
    producer: FutureProducer,
    config: QueueConfig,
}

impl JobPublisher {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", "all")
            .set("message.timeout.ms", config.publish_timeout.as_millis().to_string())
            .create()
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        Ok(Self { producer, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Publish a job keyed by its video ID.
    pub async fn publish(&self, job: &VideoJob) -> QueueResult<()> {
        let key = job.message_key();
        let payload = encode_job(job)?;

        debug!(video_id = %key, "Publishing job to {}", self.config.topic);

        let (partition, offset) = self
            .producer
            .send(
                FutureRecord::to(&self.config.topic)
                    .key(&key)
                    .payload(&payload),
                self.config.publish_timeout,
            )
            .await
            .map_err(|(e, _)| QueueError::publish_failed(format!("{}: {}", key, e)))?;

        info!(
            video_id = %key,
            partition, offset, "Published job to {}", self.config.topic
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_is_created_without_a_reachable_broker() {
        let config = QueueConfig {
            brokers: "127.0.0.1:1".to_string(),
            ..QueueConfig::default()
        };
        let publisher = JobPublisher::new(config).unwrap();
        assert_eq!(publisher.config.topic, "video-job");
    }
}
