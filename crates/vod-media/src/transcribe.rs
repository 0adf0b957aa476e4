//! TRANSCRIBE stage: the opaque transcriber invocation.
//!
//! The transcriber is an external collaborator (non-goal: the speech
//! recognition model itself). It is invoked as a subprocess whose binary is
//! configured via `TRANSCRIBER_BIN` (default `transcribe`), given the video
//! path as its sole argument, and expected to print a single JSON object on
//! stdout: `{"output_path": "...", "segments": N, "duration": F}`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

const DEFAULT_TRANSCRIBER_BIN: &str = "transcribe";

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResult {
    pub output_path: PathBuf,
    pub segments: u32,
    pub duration: f64,
}

fn transcriber_bin() -> String {
    std::env::var("TRANSCRIBER_BIN").unwrap_or_else(|_| DEFAULT_TRANSCRIBER_BIN.to_string())
}

/// Runs the transcriber against `video_path`. The core requires only that
/// `output_path` exists afterward and is parseable as a subtitle source by
/// the media tool; it does not interpret `segments`/`duration` further.
pub async fn transcribe(video_path: &Path) -> MediaResult<TranscriptionResult> {
    let bin = transcriber_bin();
    which::which(&bin).map_err(|_| MediaError::TranscriberNotFound)?;

    let output = Command::new(&bin)
        .arg(video_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::transcribe_failed(format!(
            "{bin} exited with {:?}: {}",
            output.status.code(),
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    let result: TranscriptionResult = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::transcribe_failed(format!("unparseable transcriber output: {e}")))?;

    if !result.output_path.exists() {
        return Err(MediaError::transcribe_failed(format!(
            "{} not produced",
            result.output_path.display()
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bin_is_overridable() {
        std::env::remove_var("TRANSCRIBER_BIN");
        assert_eq!(transcriber_bin(), DEFAULT_TRANSCRIBER_BIN);
        std::env::set_var("TRANSCRIBER_BIN", "whisper-cli");
        assert_eq!(transcriber_bin(), "whisper-cli");
        std::env::remove_var("TRANSCRIBER_BIN");
    }
}
