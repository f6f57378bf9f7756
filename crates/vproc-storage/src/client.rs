//! S3 client implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use vproc_models::VideoId;

use crate::error::{StorageError, StorageResult};

/// TCP connect limit for the S3 endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest pause allowed between two reads of a response.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Content type used for every object the worker writes.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Object storage operations used by the worker.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream a local file to `key` as `application/octet-stream`.
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<()>;

    /// Download `key` into a local file, replacing it if present.
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Keys under a prefix.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Public URL clients use to discover a video's objects.
    fn public_url(&self, video_id: &VideoId) -> String;
}

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint, with or without scheme (e.g. "minio:9000")
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region
    pub region: String,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("S3_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("S3_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("S3_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("S3_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("S3_BUCKET_NAME not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }

    /// Endpoint with a scheme, as the SDK expects it. Plain HTTP when none is given.
    pub fn sdk_endpoint(&self) -> String {
        if self.endpoint_url.contains("://") {
            self.endpoint_url.clone()
        } else {
            format!("http://{}", self.endpoint_url)
        }
    }

    /// Endpoint host without scheme or trailing slash.
    pub fn endpoint_host(&self) -> &str {
        let host = self
            .endpoint_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.endpoint_url);
        host.trim_end_matches('/')
    }

    /// `https://{endpoint}/{bucket}/{video_id}`
    pub fn public_url(&self, video_id: &VideoId) -> String {
        format!(
            "https://{}/{}/{}",
            self.endpoint_host(),
            self.bucket_name,
            video_id
        )
    }
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    config: S3Config,
}

impl S3Client {
    /// Create a new client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vproc",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.sdk_endpoint())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .read_timeout(READ_TIMEOUT)
                    .build(),
            )
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            config,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Create the bucket unless it already exists.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        if self
            .client
            .head_bucket()
            .bucket(self.bucket())
            .send()
            .await
            .is_ok()
        {
            info!("Bucket {} already exists", self.bucket());
            return Ok(());
        }

        match self.client.create_bucket().bucket(self.bucket()).send().await {
            Ok(_) => {
                info!("Created bucket {}", self.bucket());
                Ok(())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you()
                    || service_error.is_bucket_already_exists()
                {
                    info!("Bucket {} already owned", self.bucket());
                    Ok(())
                } else {
                    Err(StorageError::bucket(self.bucket(), service_error))
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<()> {
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(key, format!("{}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(self.bucket())
            .key(key)
            .body(body)
            .content_type(OCTET_STREAM)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(key, e))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        debug!("Downloading {} to {}", key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(key, format!("{} {}", message, service_error))
                }
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut body = response.body.into_async_read();
        let written = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| StorageError::download_failed(key, e))?;
        file.flush().await?;
        file.sync_all().await?;

        info!("Downloaded {} ({} bytes) to {}", key, written, path.display());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(key, e))?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string();
                if e.into_service_error().is_not_found()
                    || message.contains("NotFound")
                    || message.contains("NoSuchKey")
                {
                    Ok(false)
                } else {
                    Err(StorageError::download_failed(key, message))
                }
            }
        }
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        debug!("Listing objects with prefix: {}", prefix);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(self.bucket())
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::list_failed(prefix, e))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        Ok(keys)
    }

    fn public_url(&self, video_id: &VideoId) -> String {
        self.config.public_url(video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> S3Config {
        S3Config {
            endpoint_url: endpoint.to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "videos".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_public_url_without_scheme() {
        let id: VideoId = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(
            config("minio:9000").public_url(&id),
            "https://minio:9000/videos/00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn test_public_url_strips_scheme() {
        let id: VideoId = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(
            config("http://s3.local/").public_url(&id),
            "https://s3.local/videos/00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn test_sdk_endpoint_defaults_to_http() {
        assert_eq!(config("minio:9000").sdk_endpoint(), "http://minio:9000");
        assert_eq!(config("https://r2.example").sdk_endpoint(), "https://r2.example");
    }
}
