//! Dedup ledger entries recording which videos have already been submitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::city::CityId;

/// Default TTL for a dedup ledger entry before it expires and the video
/// becomes eligible for re-discovery. Overridden by `AUTOPRIORITIZE_SEEN_TTL_HOURS`.
pub const DEDUP_TTL_SECS: u64 = 24 * 60 * 60;

/// Record of a video having been handed to the pipeline, keyed by video id
/// in the shared store. Absence, or a shared-store failure while checking
/// for one, both read as "not a member" — the scanner never blocks discovery
/// on the ledger being reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupLedgerEntry {
    pub video_id: String,
    pub city_id: CityId,
    pub submitted_at: DateTime<Utc>,
}

impl DedupLedgerEntry {
    pub fn new(video_id: impl Into<String>, city_id: CityId) -> Self {
        Self {
            video_id: video_id.into(),
            city_id,
            submitted_at: Utc::now(),
        }
    }
}
