//! Topic bootstrap.

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::ClientConfig;
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};

/// Create the job topic with one partition and replication factor one,
/// unless it already exists.
pub async fn ensure_topic(config: &QueueConfig) -> QueueResult<()> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", &config.brokers)
        .create()
        .map_err(|e| QueueError::connection_failed(e.to_string()))?;

    let topic = NewTopic::new(&config.topic, 1, TopicReplication::Fixed(1));
    let results = admin
        .create_topics(&[topic], &AdminOptions::new())
        .await?;

    for result in results {
        match result {
            Ok(name) => info!("Created Kafka topic: {}", name),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                debug!("Kafka topic already exists: {}", name);
            }
            Err((name, code)) => {
                return Err(QueueError::TopicCreation(format!("{}: {}", name, code)));
            }
        }
    }

    Ok(())
}
