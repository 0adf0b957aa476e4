//! VOD client error types.

use thiserror::Error;
use vod_models::ErrorKind;

/// Result type for VOD client operations.
pub type VodClientResult<T> = Result<T, VodClientError>;

/// Errors that can occur while talking to the VOD upstream, categorized by
/// the closed error-kind vocabulary rather than left as opaque text.
#[derive(Debug, Error)]
pub enum VodClientError {
    #[error("VOD API unreachable: {0}")]
    Unreachable(String),

    #[error("VOD API error: {0}")]
    ApiError(String),

    #[error("VOD resource not found: {0}")]
    NotFound(String),

    #[error("VOD authentication failed: {0}")]
    Auth(String),

    #[error("malformed VOD response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VodClientError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::ApiError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Classify an HTTP status code into the matching error kind, per the
    /// closed error-kind vocabulary.
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        match status.as_u16() {
            401 | 403 => Self::auth(format!("{status}: {body}")),
            404 => Self::not_found(format!("{status}: {body}")),
            _ => Self::api_error(format!("{status}: {body}")),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VodClientError::Unreachable(_) => ErrorKind::ApiUnreachable,
            VodClientError::ApiError(_) => ErrorKind::ApiError,
            VodClientError::NotFound(_) => ErrorKind::NotFound,
            VodClientError::Auth(_) => ErrorKind::Auth,
            VodClientError::Malformed(_) | VodClientError::Json(_) => ErrorKind::Malformed,
            VodClientError::Network(e) if e.is_timeout() => ErrorKind::Timeout,
            VodClientError::Network(_) => ErrorKind::TransientNetwork,
            VodClientError::Io(_) => ErrorKind::TransientNetwork,
        }
    }

    /// Whether the retry helper should retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ApiUnreachable | ErrorKind::Timeout | ErrorKind::TransientNetwork
        )
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        None
    }
}
