//! Bus settings.

use std::time::Duration;

/// Kafka configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Broker address, `host:port`
    pub brokers: String,
    /// Topic carrying video jobs
    pub topic: String,
    /// Consumer group
    pub group: String,
    /// How long a publish may wait for acknowledgement
    pub publish_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "video-job".to_string(),
            group: "video-processor".to_string(),
            publish_timeout: Duration::from_secs(10),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("KAFKA_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port: u16 = std::env::var("KAFKA_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9092);

        Self {
            brokers: format!("{}:{}", host, port),
            topic: std::env::var("KAFKA_TOPIC").unwrap_or(defaults.topic),
            group: std::env::var("KAFKA_GROUP").unwrap_or(defaults.group),
            publish_timeout: defaults.publish_timeout,
        }
    }
}
