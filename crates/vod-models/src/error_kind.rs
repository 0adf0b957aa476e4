//! Closed error-kind vocabulary shared across crates.
//!
//! Every fallible operation in the system ultimately classifies its failure
//! into one of these kinds so the worker's retry policy and the health
//! aggregator can reason about failures without depending on each crate's
//! concrete error type.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    StorageUnavailable,
    StorageReadonly,
    SourceNotFound,
    InvalidMedia,
    RemuxFailed,
    UploadFailed,
    ApiUnreachable,
    ApiError,
    Auth,
    NotFound,
    Malformed,
    VerificationFailed,
    Timeout,
    TransientNetwork,
}

impl ErrorKind {
    /// Whether a task failing with this kind should be retried with backoff
    /// rather than routed straight to a terminal failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::StorageUnavailable
                | ErrorKind::ApiUnreachable
                | ErrorKind::Timeout
                | ErrorKind::TransientNetwork
        )
    }

    /// Whether the task should be deferred (rescheduled later) instead of
    /// retried immediately, because the condition is expected to outlast a
    /// short backoff window.
    pub fn is_reschedule(&self) -> bool {
        matches!(self, ErrorKind::StorageReadonly)
    }

    /// Whether the failure is permanent and further attempts are pointless.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            ErrorKind::SourceNotFound
                | ErrorKind::InvalidMedia
                | ErrorKind::Auth
                | ErrorKind::NotFound
                | ErrorKind::Malformed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StorageUnavailable => "storage-unavailable",
            ErrorKind::StorageReadonly => "storage-readonly",
            ErrorKind::SourceNotFound => "source-not-found",
            ErrorKind::InvalidMedia => "invalid-media",
            ErrorKind::RemuxFailed => "remux-failed",
            ErrorKind::UploadFailed => "upload-failed",
            ErrorKind::ApiUnreachable => "api-unreachable",
            ErrorKind::ApiError => "api-error",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Malformed => "malformed",
            ErrorKind::VerificationFailed => "verification-failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TransientNetwork => "transient-network",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_and_permanent_kinds_are_disjoint() {
        for kind in [
            ErrorKind::StorageUnavailable,
            ErrorKind::StorageReadonly,
            ErrorKind::SourceNotFound,
            ErrorKind::InvalidMedia,
            ErrorKind::RemuxFailed,
            ErrorKind::UploadFailed,
            ErrorKind::ApiUnreachable,
            ErrorKind::ApiError,
            ErrorKind::Auth,
            ErrorKind::NotFound,
            ErrorKind::Malformed,
            ErrorKind::VerificationFailed,
            ErrorKind::Timeout,
            ErrorKind::TransientNetwork,
        ] {
            assert!(!(kind.is_retryable() && kind.is_permanent_failure()));
        }
    }
}
