//! Worker error types.

use thiserror::Error;

use vproc_catalogue::CatalogueError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("transcode {height}p failed: {message}")]
    TranscodeFailed { height: u32, message: String },

    #[error("audio extraction failed: {0}")]
    AudioExtractFailed(String),

    #[error("subtitle request failed: {0}")]
    SubtitleRequestFailed(String),

    #[error("language lookup failed: {0}")]
    LanguageLookupFailed(String),

    #[error("catalogue write failed: {0}")]
    CatalogueFailed(String),

    #[error("upscale request failed: {0}")]
    UpscaleRequestFailed(String),

    #[error("storage operation failed: {0}")]
    StorageFailed(String),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("{}", join_errors(.0))]
    PartialFailure(Vec<WorkerError>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Queue error: {0}")]
    Queue(#[from] vproc_queue::QueueError),
}

fn join_errors(errors: &[WorkerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkerError {
    pub fn transcode_failed(height: u32, message: impl Into<String>) -> Self {
        Self::TranscodeFailed {
            height,
            message: message.into(),
        }
    }

    pub fn storage_failed(msg: impl Into<String>) -> Self {
        Self::StorageFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Errors carried by a partial failure, or the error itself.
    pub fn entries(&self) -> &[WorkerError] {
        match self {
            WorkerError::PartialFailure(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::FetchFailed(_) => "fetch",
            WorkerError::ProbeFailed(_) => "probe",
            WorkerError::TranscodeFailed { .. } => "transcode",
            WorkerError::AudioExtractFailed(_) => "audio",
            WorkerError::SubtitleRequestFailed(_) => "subtitles",
            WorkerError::LanguageLookupFailed(_) => "language",
            WorkerError::CatalogueFailed(_) => "catalogue",
            WorkerError::UpscaleRequestFailed(_) => "upscale",
            WorkerError::StorageFailed(_) => "storage",
            WorkerError::InvalidField(_) => "invalid_field",
            WorkerError::NotFound(_) => "not_found",
            WorkerError::TaskPanicked(_) => "panic",
            WorkerError::PartialFailure(_) => "partial",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Queue(_) => "queue",
        }
    }
}

impl From<CatalogueError> for WorkerError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::InvalidField(field) => WorkerError::InvalidField(field),
            CatalogueError::NotFound(id) => WorkerError::NotFound(id),
            other => WorkerError::CatalogueFailed(other.to_string()),
        }
    }
}
