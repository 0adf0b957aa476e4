//! Per-video pipeline state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::city::CityId;

/// Stage of the VOD captioning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    New,
    Locate,
    Validate,
    CaptionCheck,
    Transcribe,
    Remux,
    Upload,
    Quality,
    Done,
}

/// Terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Done,
    Skipped,
    Failed,
    Deferred,
}

/// Per-video mutable record carried through the pipeline stages.
///
/// Owned exclusively by the worker executing the pipeline; dropped when the
/// task envelope terminates. Never shared across tasks.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub video_id: String,
    pub city_id: CityId,
    pub source_path: Option<PathBuf>,
    pub local_path: Option<PathBuf>,
    pub caption_path: Option<PathBuf>,
    pub captioned_output_path: Option<PathBuf>,
    pub quality_score: Option<u8>,
    pub stage: PipelineStage,
}

impl PipelineContext {
    pub fn new(video_id: impl Into<String>, city_id: CityId, source_path: Option<PathBuf>) -> Self {
        Self {
            video_id: video_id.into(),
            city_id,
            source_path,
            local_path: None,
            caption_path: None,
            captioned_output_path: None,
            quality_score: None,
            stage: PipelineStage::New,
        }
    }
}

/// The result contract every terminal pipeline state returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub video_id: String,
    pub city_id: CityId,
    pub status: PipelineStatus,
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl PipelineResult {
    pub fn done(ctx: &PipelineContext, score: u8, message: impl Into<String>) -> Self {
        Self {
            video_id: ctx.video_id.clone(),
            city_id: ctx.city_id.clone(),
            status: PipelineStatus::Done,
            stage: PipelineStage::Done,
            score: Some(score),
            error: None,
            message: message.into(),
        }
    }

    pub fn skipped(ctx: &PipelineContext, message: impl Into<String>) -> Self {
        Self {
            video_id: ctx.video_id.clone(),
            city_id: ctx.city_id.clone(),
            status: PipelineStatus::Skipped,
            stage: PipelineStage::CaptionCheck,
            score: None,
            error: None,
            message: message.into(),
        }
    }

    pub fn failed(ctx: &PipelineContext, error: impl Into<String>) -> Self {
        Self {
            video_id: ctx.video_id.clone(),
            city_id: ctx.city_id.clone(),
            status: PipelineStatus::Failed,
            stage: ctx.stage,
            score: None,
            error: Some(error.into()),
            message: "pipeline failed".to_string(),
        }
    }

    pub fn deferred(ctx: &PipelineContext, error: impl Into<String>) -> Self {
        Self {
            video_id: ctx.video_id.clone(),
            city_id: ctx.city_id.clone(),
            status: PipelineStatus::Deferred,
            stage: ctx.stage,
            score: None,
            error: Some(error.into()),
            message: "deferred pending upstream availability".to_string(),
        }
    }
}
