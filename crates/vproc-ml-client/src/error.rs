//! Service client error types.

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl MlError {
    /// Whether the service never answered.
    pub fn is_timeout(&self) -> bool {
        match self {
            MlError::Network { source, .. } | MlError::Body { source, .. } => source.is_timeout(),
            MlError::ClientBuild(_) => false,
        }
    }
}
