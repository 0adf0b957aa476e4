//! Request handlers.

pub mod admin;
pub mod health;
pub mod metrics;

pub use admin::{get_queue_status, trigger_backfill, trigger_cleanup, trigger_discover, trigger_health_aggregate};
pub use health::{health, ready};
pub use metrics::metrics_snapshot;
