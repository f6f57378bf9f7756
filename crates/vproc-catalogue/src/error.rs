//! Catalogue error types.

use thiserror::Error;

/// Result type for catalogue operations.
pub type CatalogueResult<T> = Result<T, CatalogueError>;

/// Errors that can occur during catalogue operations.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Catalogue configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("No rows updated for video_id {0}")]
    NotFound(String),

    #[error("Catalogue {0} timed out after {1}s")]
    Timeout(&'static str, u64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogueError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_field(field: impl Into<String>) -> Self {
        Self::InvalidField(field.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Whether the caller passed something the catalogue refuses without a query.
    pub fn is_invalid_field(&self) -> bool {
        matches!(self, CatalogueError::InvalidField(_))
    }
}
