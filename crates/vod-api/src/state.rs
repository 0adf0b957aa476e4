//! Application state.

use std::sync::Arc;

use vod_broker::TaskBroker;
use vod_client::{VodClient, VodClientConfig};
use vod_storage::CityRegistry;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cities: CityRegistry,
    pub broker: Arc<TaskBroker>,
    pub client: VodClient,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let cities = vod_storage::load_registry(&config.cities_config)?;
        let broker = TaskBroker::from_env()?;
        broker.init().await?;

        let client = VodClientConfig::from_env()
            .and_then(VodClient::new)
            .map_err(|e| ApiError::config_error(e.to_string()))?;

        Ok(Self {
            config,
            cities,
            broker: Arc::new(broker),
            client,
        })
    }
}
