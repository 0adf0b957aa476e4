//! Dedup ledger: key existence with TTL, safe for concurrent workers.
//!
//! A shared-store failure degrades to "not a member" rather than
//! propagating, biasing toward duplicate work over lost work.

use redis::AsyncCommands;
use tracing::warn;
use vod_models::DEDUP_TTL_SECS;

use crate::error::QueueResult;

const KEY_PREFIX: &str = "vod:dedup:";

#[derive(Clone)]
pub struct DedupLedger {
    client: redis::Client,
    ttl_secs: u64,
}

impl DedupLedger {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            ttl_secs: DEDUP_TTL_SECS,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Reads `AUTOPRIORITIZE_SEEN_TTL_HOURS` (default 24h) from the
    /// environment.
    pub fn from_env(client: redis::Client) -> Self {
        let hours: u64 = std::env::var("AUTOPRIORITIZE_SEEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);
        Self::new(client).with_ttl(hours * 3600)
    }

    /// True if `key` is present in the ledger. Connection failure degrades
    /// to `false`, never propagated to the caller.
    pub async fn has(&self, key: &str) -> bool {
        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                let result: redis::RedisResult<bool> = conn.exists(Self::set_key(key)).await;
                result.unwrap_or_else(|e| {
                    warn!(error = %e, "dedup ledger unavailable, treating as not a member");
                    false
                })
            }
            Err(e) => {
                warn!(error = %e, "dedup ledger connection failed, treating as not a member");
                false
            }
        }
    }

    /// Idempotent add, refreshing the TTL on every call.
    pub async fn add(&self, key: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::set_key(key), 1, self.ttl_secs).await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::set_key(key)).await?;
        Ok(())
    }

    fn set_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}
