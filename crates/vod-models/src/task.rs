//! Task envelopes and the closed task catalogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::city::CityId;

/// Unique identifier for a task envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a broker queue. The router recognizes exactly two: priority and default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Priority,
    Default,
}

impl QueueName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Priority => "priority",
            QueueName::Default => "default",
        }
    }
}

/// The closed set of task kinds recognized by the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// For each city: scan, filter, submit up to K `PipelineProcessSingle` tasks.
    DiscoverAllCities { priority: bool },
    /// Run the pipeline for one video.
    PipelineProcessSingle {
        video_id: String,
        city_id: CityId,
        local_path: Option<String>,
    },
    /// Invoke the opaque transcriber.
    MediaTranscribe { video_path: String },
    /// Invoke the opaque media tool to re-mux with burned-in captions.
    MediaRemuxWithCaptions {
        video_path: String,
        caption_path: String,
        output_path: String,
    },
    /// Upload the captioned video and caption file via the VOD client.
    VodUpload {
        video_id: String,
        captioned_path: String,
        caption_path: String,
    },
    /// Produce a 0-100 quality score.
    VodValidateQuality { video_path: String },
    /// Delete stale temp files older than 1h.
    MaintenanceCleanupTemp,
    /// Submit up to M default-queue candidates from writable, non-busy mounts.
    MaintenanceBackfill,
    /// Run the health aggregator's checks.
    HealthAggregate,
}

impl TaskKind {
    /// Human-readable task name, used for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::DiscoverAllCities { .. } => "discover.all_cities",
            TaskKind::PipelineProcessSingle { .. } => "pipeline.process_single",
            TaskKind::MediaTranscribe { .. } => "media.transcribe",
            TaskKind::MediaRemuxWithCaptions { .. } => "media.remux_with_captions",
            TaskKind::VodUpload { .. } => "vod.upload",
            TaskKind::VodValidateQuality { .. } => "vod.validate_quality",
            TaskKind::MaintenanceCleanupTemp => "maintenance.cleanup_temp",
            TaskKind::MaintenanceBackfill => "maintenance.backfill",
            TaskKind::HealthAggregate => "health.aggregate",
        }
    }
}

/// An identified unit of work, owned by the broker until terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: TaskId,
    pub kind: TaskKind,
    pub submitted_at: DateTime<Utc>,
    pub queue: QueueName,
}

impl TaskEnvelope {
    pub fn new(kind: TaskKind, queue: QueueName) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            submitted_at: Utc::now(),
            queue,
        }
    }

    /// Idempotency key used by the broker for at-most-once-per-video submission.
    ///
    /// Only `PipelineProcessSingle` is deduplicated. The other task kinds are
    /// periodic system tasks fired by the scheduler on cadences shorter than
    /// any sensible dedup TTL; giving them a key would make the broker reject
    /// every fire after the first as a duplicate, so they get none.
    pub fn idempotency_key(&self) -> Option<String> {
        match &self.kind {
            TaskKind::PipelineProcessSingle { video_id, .. } => {
                Some(format!("pipeline:{}", video_id))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_is_stable_for_same_video() {
        let a = TaskEnvelope::new(
            TaskKind::PipelineProcessSingle {
                video_id: "flex_flex3_0".to_string(),
                city_id: CityId::new("flex3"),
                local_path: None,
            },
            QueueName::Priority,
        );
        let b = TaskEnvelope::new(
            TaskKind::PipelineProcessSingle {
                video_id: "flex_flex3_0".to_string(),
                city_id: CityId::new("flex3"),
                local_path: None,
            },
            QueueName::Default,
        );
        assert_eq!(a.idempotency_key(), b.idempotency_key());
    }
}
