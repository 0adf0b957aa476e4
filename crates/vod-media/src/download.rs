//! Resilient streaming downloader.
//!
//! Replaces a `yt-dlp` subprocess wrapper with a `reqwest`-streaming
//! implementation: directory preflight, download-cache consultation, a HEAD-based
//! type/size gate, chunked transfer with progress logging, and bounded retry.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use vod_broker::{DownloadCache, DownloadCacheEntry};

use crate::error::{MediaError, MediaResult};

/// Chunk size for streaming transfer.
const CHUNK_SIZE_LOG_BOUNDARY: u64 = 10 * 1024 * 1024;

/// Default maximum content-length accepted for auxiliary artifacts (captions, etc).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum content-length accepted for full media downloads.
pub const MEDIA_MAX_SIZE_BYTES: u64 = 20 * 1024 * 1024 * 1024;

const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
const RETRY_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub timeout: Duration,
    pub max_size_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
        }
    }
}

impl DownloadConfig {
    /// Auxiliary-artifact cap from `MAX_CONTENT_LENGTH` (default 50 MiB).
    /// Media downloads should override `max_size_bytes` to `MEDIA_MAX_SIZE_BYTES`.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            max_size_bytes: std::env::var("MAX_CONTENT_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_SIZE_BYTES),
        }
    }
}

fn accepted_content_type(content_type: &str, url: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    if ct.starts_with("video/") || ct == "application/pdf" {
        return true;
    }
    let known_extensions = [".mp4", ".mov", ".mkv", ".scc", ".srt", ".vtt"];
    known_extensions
        .iter()
        .any(|ext| url.to_ascii_lowercase().ends_with(ext))
}

/// Downloads `url` into `destination_path`, consulting and updating `cache`
/// along the way. Matches the preflight / transfer / retry / verification
/// contract: directory creation, writability check, cache lookup, HEAD gate,
/// chunked GET, non-zero-size verification.
pub async fn download(
    client: &reqwest::Client,
    cache: &DownloadCache,
    url: &str,
    destination_path: &Path,
    config: &DownloadConfig,
) -> MediaResult<()> {
    let dir = destination_path.parent().ok_or_else(|| {
        MediaError::StorageUnavailable(format!(
            "{} has no parent directory",
            destination_path.display()
        ))
    })?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| MediaError::StorageUnavailable(format!("{}: {e}", dir.display())))?;

    if !vod_storage::is_writable(dir) {
        return Err(MediaError::StorageReadonly(dir.display().to_string()));
    }

    if let Some(cached) = cache.get(url).await {
        if !cached.ok {
            let reason = cached.reason.unwrap_or_else(|| "unknown".to_string());
            return Err(MediaError::rejected(url, reason));
        }
    } else {
        preflight_head(client, cache, url, config).await?;
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match transfer(client, url, destination_path, config).await {
            Ok(()) => {
                verify(destination_path)?;
                return Ok(());
            }
            Err(e) if e.is_transient() && attempt < RETRY_MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                warn!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "download attempt failed, retrying: {}",
                    e
                );
                let _ = tokio::fs::remove_file(destination_path).await;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn preflight_head(
    client: &reqwest::Client,
    cache: &DownloadCache,
    url: &str,
    config: &DownloadConfig,
) -> MediaResult<()> {
    let response = client.head(url).send().await?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let content_length = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if !accepted_content_type(&content_type, url) {
        let entry = DownloadCacheEntry::rejected("type");
        let _ = cache.put(url, &entry).await;
        return Err(MediaError::rejected(url, "type"));
    }

    if let Some(len) = content_length {
        if len > config.max_size_bytes {
            let entry = DownloadCacheEntry::rejected("size");
            let _ = cache.put(url, &entry).await;
            return Err(MediaError::rejected(url, "size"));
        }
    }

    let entry = DownloadCacheEntry::accepted(Some(content_type), content_length);
    let _ = cache.put(url, &entry).await;
    Ok(())
}

async fn transfer(
    client: &reqwest::Client,
    url: &str,
    destination_path: &Path,
    config: &DownloadConfig,
) -> MediaResult<()> {
    let response = client
        .get(url)
        .timeout(config.timeout)
        .send()
        .await
        .map_err(classify_transport_error)?;

    if !response.status().is_success() {
        return Err(MediaError::rejected(
            url,
            format!("http-{}", response.status().as_u16()),
        ));
    }

    let mut file = tokio::fs::File::create(destination_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_logged_boundary: u64 = 0;

    use futures_util::StreamExt;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify_transport_error)?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if downloaded - last_logged_boundary >= CHUNK_SIZE_LOG_BOUNDARY {
            info!(
                url,
                downloaded_mb = downloaded / (1024 * 1024),
                "download progress"
            );
            last_logged_boundary = downloaded;
        }
    }

    file.flush().await?;
    debug!(url, bytes = downloaded, "download transfer complete");
    Ok(())
}

fn classify_transport_error(e: reqwest::Error) -> MediaError {
    if e.is_timeout() {
        MediaError::Timeout(e.to_string())
    } else if e.is_connect() {
        MediaError::TransientNetwork(e.to_string())
    } else {
        MediaError::Http(e)
    }
}

fn verify(path: &Path) -> MediaResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => {
            let _ = std::fs::remove_file(path);
            Err(MediaError::VerificationFailed(path.display().to_string()))
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    exp.min(RETRY_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_video_content_type() {
        assert!(accepted_content_type("video/mp4", "https://x/y.bin"));
    }

    #[test]
    fn accepts_known_extension_regardless_of_content_type() {
        assert!(accepted_content_type(
            "application/octet-stream",
            "https://x/video.mp4"
        ));
    }

    #[test]
    fn rejects_unknown_type_and_extension() {
        assert!(!accepted_content_type("text/html", "https://x/page"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(5), Duration::from_secs(30));
    }
}
