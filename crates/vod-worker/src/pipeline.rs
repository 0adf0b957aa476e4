//! The VOD pipeline: the per-video state machine, driven entirely
//! in-process (no queue round-trip between stages).
//!
//! ```text
//! NEW -> LOCATE -> VALIDATE -> CAPTION-CHECK -> {SKIP | TRANSCRIBE}
//! TRANSCRIBE -> REMUX -> UPLOAD -> QUALITY -> DONE
//! any -> FAILED
//! any -> DEFERRED (upstream API unreachable only)
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vod_broker::DownloadCache;
use vod_client::VodClient;
use vod_media::{DownloadConfig, MEDIA_MAX_SIZE_BYTES};
use vod_models::{AlertLevel, CityDescriptor, CityId, ErrorKind, PipelineContext, PipelineResult, PipelineStage};
use vod_storage::CityRegistry;

use crate::alerts::AlertSink;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

const MIN_QUALITY_SIZE_BYTES: u64 = 1024 * 1024;

/// Dependencies the pipeline needs, bundled once at worker startup and
/// shared (clone-cheap) across every `run_pipeline` invocation.
#[derive(Clone)]
pub struct PipelineDeps {
    pub cities: CityRegistry,
    pub client: VodClient,
    pub http: reqwest::Client,
    pub download_cache: DownloadCache,
    pub alerts: Arc<AlertSink>,
    pub work_dir: PathBuf,
    /// Count of transcriptions currently running in this process, checked
    /// by `maintenance.backfill`'s "no transcription active anywhere" gate.
    pub transcribing: Arc<AtomicUsize>,
}

impl PipelineDeps {
    fn city(&self, city_id: &CityId) -> WorkerResult<&CityDescriptor> {
        self.cities
            .get(city_id)
            .ok_or_else(|| WorkerError::config_error(format!("unknown city {city_id}")))
    }
}

/// RAII guard incrementing `PipelineDeps::transcribing` for the lifetime of
/// a transcription call, decremented on every exit path including errors.
struct TranscribingGuard<'a>(&'a AtomicUsize);

impl<'a> TranscribingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for TranscribingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs a single video through the full state machine, returning the
/// result contract. Never panics on operational failure; every error path
/// resolves to a terminal `PipelineResult`.
#[tracing::instrument(skip(deps), fields(video_id = %ctx.video_id, city_id = %ctx.city_id))]
pub async fn run_pipeline(mut ctx: PipelineContext, deps: &PipelineDeps) -> PipelineResult {
    metrics::record_counter(metrics::names::PIPELINE_START);

    ctx.stage = PipelineStage::Locate;
    if let Err(e) = locate(&mut ctx, deps).await {
        return finish(ctx, deps, e).await;
    }

    ctx.stage = PipelineStage::Validate;
    if let Err(e) = validate(&ctx).await {
        return finish(ctx, deps, e).await;
    }

    ctx.stage = PipelineStage::CaptionCheck;
    if caption_check(&ctx, deps) {
        return finish_skipped(ctx, deps).await;
    }

    ctx.stage = PipelineStage::Transcribe;
    if let Err(e) = transcribe_stage(&mut ctx, deps).await {
        return finish(ctx, deps, e).await;
    }

    ctx.stage = PipelineStage::Remux;
    if let Err(e) = remux_stage(&mut ctx, deps).await {
        return finish(ctx, deps, e).await;
    }

    ctx.stage = PipelineStage::Upload;
    if let Err(e) = upload_stage(&ctx, deps).await {
        return finish(ctx, deps, e).await;
    }

    ctx.stage = PipelineStage::Quality;
    let score = quality_stage(&ctx).await;

    ctx.stage = PipelineStage::Done;
    finish_done(ctx, deps, score).await
}

/// (i) caller-provided path; (ii) mount scan by video-id/title match; (iii)
/// derived-URL download fallback.
async fn locate(ctx: &mut PipelineContext, deps: &PipelineDeps) -> WorkerResult<()> {
    if let Some(candidate) = ctx.source_path.clone() {
        if candidate.is_file() && std::fs::File::open(&candidate).is_ok() {
            ctx.local_path = Some(candidate);
            return Ok(());
        }
    }

    if let Ok(city) = deps.city(&ctx.city_id) {
        let candidates = vod_storage::scan_mount(&city.mount_path, &ctx.city_id, 5000);
        let needle = ctx.video_id.to_ascii_lowercase();
        let found = candidates.into_iter().find(|c| {
            let basename = c.basename().to_ascii_lowercase();
            basename.contains(&needle) || city.title_matches(&basename)
        });
        if let Some(candidate) = found {
            ctx.local_path = Some(candidate.path);
            return Ok(());
        }
    }

    match deps.client.get_vod(&ctx.video_id).await {
        Ok(_) => {
            let url = deps.client.derive_source_url(&ctx.video_id);
            let dest = deps.work_dir.join(format!("vod_{}.mp4", ctx.video_id));
            let config = DownloadConfig {
                max_size_bytes: MEDIA_MAX_SIZE_BYTES,
                ..DownloadConfig::from_env()
            };

            metrics::record_counter(metrics::names::DOWNLOAD_ATTEMPT);
            let started = std::time::Instant::now();
            let result = vod_media::download(&deps.http, &deps.download_cache, &url, &dest, &config).await;
            metrics::record_duration_seconds(metrics::names::DOWNLOAD_DURATION_SECONDS, started.elapsed());
            match result {
                Ok(()) => {
                    metrics::record_counter(metrics::names::DOWNLOAD_SUCCESS);
                    ctx.local_path = Some(dest);
                    Ok(())
                }
                Err(e) => {
                    metrics::record_counter(metrics::names::DOWNLOAD_FAILED);
                    Err(WorkerError::from(e))
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::ApiUnreachable => Err(WorkerError::from(e)),
        Err(_) => Err(WorkerError::from(vod_media::MediaError::FileNotFound(
            PathBuf::from(&ctx.video_id),
        ))),
    }
}

/// A decodable video stream within the 30s probe budget, or FAILED.
async fn validate(ctx: &PipelineContext) -> WorkerResult<()> {
    let path = ctx.local_path.as_ref().expect("locate sets local_path on success");
    let info = vod_media::probe_video(path).await.map_err(WorkerError::from)?;
    if !info.is_decodable() {
        return Err(WorkerError::from(vod_media::MediaError::InvalidVideo(
            "probe returned no decodable video stream".to_string(),
        )));
    }
    Ok(())
}

fn caption_check(ctx: &PipelineContext, deps: &PipelineDeps) -> bool {
    let video_path = ctx.local_path.as_ref().expect("locate sets local_path on success");
    let global_output_dir = deps
        .city(&ctx.city_id)
        .ok()
        .map(|city| city.mount_path.join("vod_processed"));
    vod_storage::has_caption(video_path, global_output_dir.as_deref())
}

/// Pre-checks mount writability, runs the transcriber in-process, and
/// copies its output into `<mount>/vod_processed/<video-id>.scc`.
async fn transcribe_stage(ctx: &mut PipelineContext, deps: &PipelineDeps) -> WorkerResult<()> {
    let city = deps.city(&ctx.city_id)?;
    let output_dir = city.mount_path.join("vod_processed");

    if !vod_storage::is_mountpoint(&city.mount_path) || !vod_storage::is_writable(&city.mount_path) {
        return Err(WorkerError::from(vod_storage::StorageError::mount_unreadable(
            city.mount_path.display().to_string(),
        )));
    }

    tokio::fs::create_dir_all(&output_dir).await?;

    let video_path = ctx.local_path.clone().expect("validate confirmed local_path");
    let _guard = TranscribingGuard::enter(&deps.transcribing);
    let result = vod_media::transcribe(&video_path).await.map_err(WorkerError::from)?;

    let dest = output_dir.join(format!("{}.scc", ctx.video_id));
    vod_media::move_file(&result.output_path, &dest).await.map_err(WorkerError::from)?;
    ctx.caption_path = Some(dest);
    Ok(())
}

/// Produces `<basename>_captioned.mp4` via the opaque media tool, bounded
/// to 1h; `remux_with_captions` already enforces the non-zero-size check.
async fn remux_stage(ctx: &mut PipelineContext, deps: &PipelineDeps) -> WorkerResult<()> {
    let city = deps.city(&ctx.city_id)?;
    let output_dir = city.mount_path.join("vod_processed");
    let video_path = ctx.local_path.clone().expect("validate confirmed local_path");
    let caption_path = ctx.caption_path.clone().expect("transcribe_stage set caption_path");

    let output = vod_media::remux_with_captions(&video_path, &caption_path, &output_dir)
        .await
        .map_err(WorkerError::from)?;
    ctx.captioned_output_path = Some(output);
    Ok(())
}

/// Two sub-uploads through C10; either failure maps through its error
/// kind, `api-unreachable` surfacing as DEFERRED via the shared `finish` path.
async fn upload_stage(ctx: &PipelineContext, deps: &PipelineDeps) -> WorkerResult<()> {
    let video_path = ctx
        .captioned_output_path
        .as_ref()
        .expect("remux_stage set captioned_output_path");
    let caption_path = ctx.caption_path.as_ref().expect("transcribe_stage set caption_path");

    deps.client.upload_video_file(&ctx.video_id, video_path).await?;
    deps.client.upload_caption_file(&ctx.video_id, caption_path).await?;
    Ok(())
}

/// 25 points each: probe-confirmed integrity, size >= 1 MiB, duration > 0,
/// at least one subtitle stream in the captioned output.
async fn quality_stage(ctx: &PipelineContext) -> u8 {
    let Some(output) = ctx.captioned_output_path.as_ref() else {
        return 0;
    };

    let mut score: u8 = 0;

    if let Ok(info) = vod_media::probe_video(output).await {
        if info.is_decodable() {
            score += 25;
        }
        if info.duration > 0.0 {
            score += 25;
        }
        if info.has_subtitle_stream {
            score += 25;
        }
    }

    if let Ok(meta) = std::fs::metadata(output) {
        if meta.len() >= MIN_QUALITY_SIZE_BYTES {
            score += 25;
        }
    }

    score
}

async fn finish(ctx: PipelineContext, deps: &PipelineDeps, err: WorkerError) -> PipelineResult {
    if err.kind() == ErrorKind::ApiUnreachable {
        return finish_deferred(ctx, deps, err).await;
    }
    finish_failed(ctx, deps, err).await
}

async fn finish_failed(ctx: PipelineContext, deps: &PipelineDeps, err: WorkerError) -> PipelineResult {
    metrics::record_counter(metrics::names::PIPELINE_FAILED);
    let result = PipelineResult::failed(&ctx, err.to_string());
    emit_terminal_alert(deps, AlertLevel::Error, &result).await;
    result
}

async fn finish_deferred(ctx: PipelineContext, deps: &PipelineDeps, err: WorkerError) -> PipelineResult {
    metrics::record_counter(metrics::names::PIPELINE_DEFERRED);
    let result = PipelineResult::deferred(&ctx, err.to_string());
    emit_terminal_alert(deps, AlertLevel::Warning, &result).await;
    result
}

async fn finish_skipped(ctx: PipelineContext, deps: &PipelineDeps) -> PipelineResult {
    let result = PipelineResult::skipped(&ctx, "caption artifact already present");
    emit_terminal_alert(deps, AlertLevel::Warning, &result).await;
    result
}

async fn finish_done(ctx: PipelineContext, deps: &PipelineDeps, score: u8) -> PipelineResult {
    metrics::record_counter(metrics::names::PIPELINE_DONE);
    let result = PipelineResult::done(&ctx, score, "pipeline complete");
    emit_terminal_alert(deps, AlertLevel::Info, &result).await;
    result
}

async fn emit_terminal_alert(deps: &PipelineDeps, level: AlertLevel, result: &PipelineResult) {
    let mut context = BTreeMap::new();
    context.insert("video_id".to_string(), result.video_id.clone());
    context.insert("city_id".to_string(), result.city_id.to_string());
    context.insert("stage".to_string(), format!("{:?}", result.stage));
    if let Some(score) = result.score {
        context.insert("score".to_string(), score.to_string());
    }
    if let Some(error) = &result.error {
        context.insert("error".to_string(), error.clone());
    }
    deps.alerts.emit(level, &result.message, context).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_score_is_sum_of_four_criteria() {
        assert_eq!(0u8 + 25 + 25 + 25 + 25, 100);
    }

    #[test]
    fn min_quality_size_is_one_mebibyte() {
        assert_eq!(MIN_QUALITY_SIZE_BYTES, 1024 * 1024);
    }
}
