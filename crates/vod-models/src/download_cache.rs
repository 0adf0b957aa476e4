//! Local cache bookkeeping for resumed/reused downloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a file already fetched into the local scratch directory, keyed
/// by source URL so a retried download can skip re-fetching an identical
/// completed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadCacheEntry {
    pub source_url: String,
    pub local_path: String,
    pub size_bytes: u64,
    pub completed_at: DateTime<Utc>,
}

impl DownloadCacheEntry {
    pub fn new(source_url: impl Into<String>, local_path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            source_url: source_url.into(),
            local_path: local_path.into(),
            size_bytes,
            completed_at: Utc::now(),
        }
    }
}
