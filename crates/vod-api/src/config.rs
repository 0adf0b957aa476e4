//! API server configuration.

use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// API server configuration: the HTTP surface knobs plus the keys shared
/// with the worker (`BROKER_URL`, `CITIES_CONFIG`, `VOD_API_BASE_URL`).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    pub environment: String,
    pub broker_url: String,
    pub cities_config: String,
}

impl ApiConfig {
    /// Builds config from environment variables. Fails with
    /// `ApiError::config_error` if `BROKER_URL` or `CITIES_CONFIG` is absent,
    /// matching the worker's `WorkerConfig::from_env` requirement.
    pub fn from_env() -> ApiResult<Self> {
        let broker_url = std::env::var("BROKER_URL")
            .map_err(|_| ApiError::config_error("BROKER_URL is required"))?;
        let cities_config = std::env::var("CITIES_CONFIG")
            .map_err(|_| ApiError::config_error("CITIES_CONFIG is required"))?;

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            broker_url,
            cities_config,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
