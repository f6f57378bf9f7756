//! Storage error types.

use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Object store failures. Per-object variants carry the key involved.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage config error: {0}")]
    ConfigError(String),

    #[error("no object at {key}")]
    NotFound { key: String },

    #[error("upload to {key} failed: {message}")]
    UploadFailed { key: String, message: String },

    #[error("download of {key} failed: {message}")]
    DownloadFailed { key: String, message: String },

    #[error("delete of {key} failed: {message}")]
    DeleteFailed { key: String, message: String },

    #[error("listing {prefix} failed: {message}")]
    ListFailed { prefix: String, message: String },

    #[error("bucket {bucket}: {message}")]
    Bucket { bucket: String, message: String },

    #[error("{op} of {key} timed out after {after:?}")]
    Timeout {
        op: &'static str,
        key: String,
        after: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn upload_failed(key: impl Into<String>, cause: impl Display) -> Self {
        Self::UploadFailed {
            key: key.into(),
            message: cause.to_string(),
        }
    }

    pub fn download_failed(key: impl Into<String>, cause: impl Display) -> Self {
        Self::DownloadFailed {
            key: key.into(),
            message: cause.to_string(),
        }
    }

    pub fn delete_failed(key: impl Into<String>, cause: impl Display) -> Self {
        Self::DeleteFailed {
            key: key.into(),
            message: cause.to_string(),
        }
    }

    pub fn list_failed(prefix: impl Into<String>, cause: impl Display) -> Self {
        Self::ListFailed {
            prefix: prefix.into(),
            message: cause.to_string(),
        }
    }

    pub fn bucket(bucket: impl Into<String>, cause: impl Display) -> Self {
        Self::Bucket {
            bucket: bucket.into(),
            message: cause.to_string(),
        }
    }

    pub fn timeout(op: &'static str, key: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            op,
            key: key.into(),
            after,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_key() {
        let err = StorageError::upload_failed("abc/480.mp4", "connection reset");
        assert_eq!(err.to_string(), "upload to abc/480.mp4 failed: connection reset");
        assert!(StorageError::not_found("abc/tmp.mp4").is_not_found());
    }
}
