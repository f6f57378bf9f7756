//! Deadline wrapper for object store calls.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use vproc_models::VideoId;

use crate::client::ObjectStore;
use crate::error::{StorageError, StorageResult};

/// Bounds every call on the wrapped store with the same deadline.
#[derive(Clone)]
pub struct TimedStore {
    inner: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, op: &'static str, key: &str, call: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, key, "Storage call exceeded {:?}", self.timeout);
                Err(StorageError::timeout(op, key, self.timeout))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for TimedStore {
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<()> {
        self.bounded("upload", key, self.inner.upload_file(path, key))
            .await
    }

    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        self.bounded("download", key, self.inner.download_file(key, path))
            .await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.bounded("delete", key, self.inner.delete_object(key))
            .await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.bounded("head", key, self.inner.exists(key)).await
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.bounded("list", prefix, self.inner.list_keys(prefix))
            .await
    }

    fn public_url(&self, video_id: &VideoId) -> String {
        self.inner.public_url(video_id)
    }
}
