//! Axum API server binary.

use std::net::SocketAddr;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_api::{create_router, metrics, ApiConfig, ApiError, AppState};

const EXIT_GENERIC_FAILURE: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_DEPENDENCY_UNREACHABLE: i32 = 3;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vod=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(env_filter).init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true).with_file(false).with_line_number(false))
            .with(env_filter)
            .init();
    }

    info!("starting vod-api");

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid API configuration");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    info!(host = %config.host, port = config.port, "API config loaded");

    let state = match AppState::new(config.clone()).await {
        Ok(s) => s,
        Err(ApiError::Broker(e)) => {
            error!(error = %e, "broker unreachable at startup");
            std::process::exit(EXIT_DEPENDENCY_UNREACHABLE);
        }
        Err(e) => {
            error!(error = %e, "failed to create application state");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let prometheus_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let app = create_router(state, prometheus_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid bind address");

    info!(%addr, "listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind listener");
            std::process::exit(EXIT_GENERIC_FAILURE);
        }
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error");
        std::process::exit(EXIT_GENERIC_FAILURE);
    }

    info!("server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
    info!("received shutdown signal");
}
