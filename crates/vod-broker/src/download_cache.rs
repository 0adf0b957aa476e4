//! Download cache: HEAD-preflight results, consulted before issuing a GET.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::QueueResult;

const KEY_PREFIX: &str = "vod:download_cache:";
const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadCacheEntry {
    pub ok: bool,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Rejection reason when `ok` is false, e.g. "type" or "size".
    pub reason: Option<String>,
}

impl DownloadCacheEntry {
    pub fn accepted(content_type: Option<String>, content_length: Option<u64>) -> Self {
        Self {
            ok: true,
            content_type,
            content_length,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            content_type: None,
            content_length: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Clone)]
pub struct DownloadCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl DownloadCache {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    /// Returns `None` on cache miss or shared-store failure; either way the
    /// caller falls through to a fresh HEAD probe.
    pub async fn get(&self, url: &str) -> Option<DownloadCacheEntry> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "download cache connection failed");
                return None;
            }
        };
        let raw: Option<String> = conn.get(Self::key(url)).await.ok().flatten();
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn put(&self, url: &str, entry: &DownloadCacheEntry) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(entry)?;
        conn.set_ex::<_, _, ()>(Self::key(url), payload, self.ttl_secs).await?;
        Ok(())
    }

    fn key(url: &str) -> String {
        format!("{KEY_PREFIX}{url}")
    }
}
