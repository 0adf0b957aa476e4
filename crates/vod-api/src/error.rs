//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vod_models::ErrorKind;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] vod_storage::StorageError),

    #[error("broker error: {0}")]
    Broker(#[from] vod_broker::QueueError),

    #[error("VOD client error: {0}")]
    Client(#[from] vod_client::VodClientError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Maps the closed error-kind vocabulary to an HTTP status.
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(e) => kind_to_status(e.kind()),
            ApiError::Broker(e) => kind_to_status(e.kind()),
            ApiError::Client(e) => kind_to_status(e.kind()),
        }
    }
}

fn kind_to_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound | ErrorKind::SourceNotFound => StatusCode::NOT_FOUND,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::Malformed => StatusCode::BAD_REQUEST,
        ErrorKind::ApiUnreachable | ErrorKind::StorageUnavailable | ErrorKind::Timeout | ErrorKind::TransientNetwork => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match &self {
            ApiError::Internal(_) | ApiError::ConfigError(_) | ApiError::Storage(_) | ApiError::Broker(_) | ApiError::Client(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
