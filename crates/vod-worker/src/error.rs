//! Worker error types.

use thiserror::Error;
use vod_models::ErrorKind;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("reschedule: {0}")]
    Reschedule(String),

    #[error("storage error: {0}")]
    Storage(#[from] vod_storage::StorageError),

    #[error("VOD client error: {0}")]
    Client(#[from] vod_client::VodClientError),

    #[error("media error: {0}")]
    Media(#[from] vod_media::MediaError),

    #[error("broker error: {0}")]
    Broker(#[from] vod_broker::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Indicates the task should be retried later rather than failed now —
    /// used for the UPLOAD stage's upstream-unreachable-to-DEFERRED transition.
    pub fn reschedule(msg: impl Into<String>) -> Self {
        Self::Reschedule(msg.into())
    }

    /// Classification used by the pipeline's FAILED/DEFERRED routing and the
    /// health aggregator, delegating to each upstream crate's own `kind()`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::TaskFailed(_) => ErrorKind::ApiError,
            WorkerError::ConfigError(_) => ErrorKind::Malformed,
            WorkerError::Reschedule(_) => ErrorKind::ApiUnreachable,
            WorkerError::Storage(e) => e.kind(),
            WorkerError::Client(e) => e.kind(),
            WorkerError::Media(e) => e.kind(),
            WorkerError::Broker(e) => e.kind(),
            WorkerError::Io(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Whether this error should be retried with backoff rather than routed
    /// straight to a terminal failure.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Whether the pipeline should defer rather than fail outright — per
    /// the UPLOAD rule, true only for upstream-API-unreachable.
    pub fn is_reschedule(&self) -> bool {
        matches!(self, WorkerError::Reschedule(_)) || self.kind() == ErrorKind::ApiUnreachable
    }

    /// Whether retrying is pointless — the source/media itself is invalid.
    pub fn is_permanent_failure(&self) -> bool {
        self.kind().is_permanent_failure()
    }
}
