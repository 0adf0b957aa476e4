//! Redis-backed task broker for the Archivist VOD captioning pipeline.
//!
//! This crate provides:
//! - Task enqueueing/consumption via Redis Streams, two named queues
//! - Priority-first consumption with crashed-worker pending reclaim
//! - The dedup ledger (C4) and the downloader's HEAD-probe cache

pub mod dedup;
pub mod download_cache;
pub mod error;
pub mod queue;

pub use dedup::DedupLedger;
pub use download_cache::{DownloadCache, DownloadCacheEntry};
pub use error::{QueueError, QueueResult};
pub use queue::{QueueConfig, TaskBroker};
