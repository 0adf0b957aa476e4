//! Storage error types.

use thiserror::Error;
use vod_models::ErrorKind;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while loading the city registry or scanning mounts.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to load city registry: {0}")]
    RegistryConfig(String),

    #[error("mount not readable: {0}")]
    MountUnreadable(String),

    #[error("mount is read-only: {0}")]
    MountReadonly(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn registry_config(msg: impl Into<String>) -> Self {
        Self::RegistryConfig(msg.into())
    }

    pub fn mount_unreadable(msg: impl Into<String>) -> Self {
        Self::MountUnreadable(msg.into())
    }

    /// Classification used by the worker's retry policy and health aggregator.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::RegistryConfig(_) => ErrorKind::Malformed,
            StorageError::MountUnreadable(_) => ErrorKind::StorageUnavailable,
            StorageError::MountReadonly(_) => ErrorKind::StorageReadonly,
            StorageError::Io(_) => ErrorKind::StorageUnavailable,
            StorageError::Json(_) => ErrorKind::Malformed,
        }
    }
}
