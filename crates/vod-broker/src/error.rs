//! Broker error types.

use thiserror::Error;
use vod_models::ErrorKind;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::ConnectionFailed(_) | QueueError::Redis(_) => ErrorKind::StorageUnavailable,
            QueueError::EnqueueFailed(_) => ErrorKind::TransientNetwork,
            QueueError::Json(_) => ErrorKind::Malformed,
        }
    }
}
