//! Operator alert records sent through the alert sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an alert, ordered least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

/// A single operator-facing alert, emitted by the health aggregator or the
/// pipeline on a terminal failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub detail: String,
    pub emitted_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            detail: detail.into(),
            emitted_at: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, title, detail)
    }

    pub fn warning(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, title, detail)
    }

    pub fn error(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, title, detail)
    }
}
