//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use vod_models::ErrorKind;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media download, probing, transcription, and remux.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("transcriber not found in PATH")]
    TranscriberNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("transcriber failed: {message}")]
    TranscribeFailed { message: String },

    #[error("remux failed: {0}")]
    RemuxFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("destination directory unavailable: {0}")]
    StorageUnavailable(String),

    #[error("destination directory is read-only: {0}")]
    StorageReadonly(String),

    #[error("download rejected by preflight ({reason}): {url}")]
    Rejected { url: String, reason: String },

    #[error("download verification failed: {0}")]
    VerificationFailed(String),

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid video file: {0}")]
    InvalidVideo(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn transcribe_failed(message: impl Into<String>) -> Self {
        Self::TranscribeFailed {
            message: message.into(),
        }
    }

    pub fn rejected(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classifies this error into the shared cross-cutting error vocabulary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::StorageReadonly(_) => ErrorKind::StorageReadonly,
            Self::FileNotFound(_) => ErrorKind::SourceNotFound,
            Self::InvalidVideo(_)
            | Self::FfprobeFailed { .. }
            | Self::FfprobeNotFound => ErrorKind::InvalidMedia,
            Self::RemuxFailed(_) | Self::FfmpegFailed { .. } | Self::FfmpegNotFound => {
                ErrorKind::RemuxFailed
            }
            Self::TranscribeFailed { .. } | Self::TranscriberNotFound => ErrorKind::InvalidMedia,
            Self::VerificationFailed(_) => ErrorKind::VerificationFailed,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::TransientNetwork(_) => ErrorKind::TransientNetwork,
            Self::Rejected { .. } => ErrorKind::InvalidMedia,
            Self::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Http(e) if e.is_connect() => ErrorKind::TransientNetwork,
            Self::Http(_) => ErrorKind::ApiError,
            Self::Io(_) | Self::JsonParse(_) | Self::Internal(_) | Self::Cancelled => {
                ErrorKind::InvalidMedia
            }
        }
    }

    /// Whether a retry of the same download attempt is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_) | Self::Timeout(_)
        ) || matches!(self, Self::Http(e) if e.is_timeout() || e.is_connect())
    }
}
