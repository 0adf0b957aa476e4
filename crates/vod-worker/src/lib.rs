#![deny(unreachable_patterns)]
//! Archivist pipeline worker.
//!
//! This crate provides:
//! - Configuration and structured logging
//! - The broker-driven task executor and the per-video pipeline state machine
//! - The wall-clock scheduler that fires the six named maintenance tasks
//! - The operator alert sink and the health aggregator
//! - Process metrics, exported both as Prometheus counters and a JSON snapshot

pub mod alerts;
pub mod config;
pub mod error;
pub mod executor;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod platform;
pub mod retry;
pub mod scheduler;

pub use alerts::AlertSink;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::Executor;
pub use health::{run_health_checks, touch_heartbeat, HealthReport};
pub use logging::TaskLogger;
pub use pipeline::{run_pipeline, PipelineDeps};
pub use scheduler::{CronEntry, Scheduler};
