//! REMUX stage: the opaque media tool invocation that embeds a caption
//! artifact into a new video container.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

const REMUX_TIMEOUT_SECS: u64 = 60 * 60;

/// Produces `<basename>_captioned.mp4` in `output_dir`, muxing `video_path`'s
/// streams with a subtitle track derived from `caption_path`. The output
/// video/audio are stream-copied; only the subtitle track is added.
pub async fn remux_with_captions(
    video_path: &Path,
    caption_path: &Path,
    output_dir: &Path,
) -> MediaResult<PathBuf> {
    let basename = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MediaError::internal("video path has no file stem"))?;
    let output_path = output_dir.join(format!("{basename}_captioned.mp4"));

    let cmd = FfmpegCommand::new(video_path, &output_path)
        .extra_input(caption_path)
        .video_codec("copy")
        .audio_codec("copy")
        .output_args(["-c:s", "mov_text", "-map", "0:v:0", "-map", "0:a:0?", "-map", "1:0"]);

    let runner = FfmpegRunner::new().with_timeout(REMUX_TIMEOUT_SECS);
    runner.run(&cmd).await.map_err(|e| match e {
        MediaError::Timeout(_) => MediaError::RemuxFailed("remux timed out after 1h".to_string()),
        other => MediaError::RemuxFailed(other.to_string()),
    })?;

    match std::fs::metadata(&output_path) {
        Ok(meta) if meta.len() > 0 => {
            info!(output = %output_path.display(), "remux complete");
            Ok(output_path)
        }
        _ => {
            let _ = std::fs::remove_file(&output_path);
            Err(MediaError::RemuxFailed(format!(
                "{} missing or empty after remux",
                output_path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_derives_from_video_basename() {
        let video = Path::new("/mnt/city/videos/2026-01-01-meeting.mp4");
        let basename = video.file_stem().unwrap().to_str().unwrap();
        assert_eq!(basename, "2026-01-01-meeting");
    }
}
