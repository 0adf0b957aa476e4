//! Operator-facing Axum HTTP surface for the Archivist orchestration core.
//!
//! This crate provides:
//! - Liveness/readiness endpoints backed by the worker's health aggregator
//! - A Prometheus exposition plus a JSON metrics snapshot
//! - Manual trigger endpoints for the city-scoped maintenance tasks
//!
//! No end-user authentication or rate limiting: this API sits behind the
//! same network perimeter as the broker and is operator-only.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
