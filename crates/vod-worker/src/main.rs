//! Archivist pipeline worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vod_broker::TaskBroker;
use vod_client::{VodClient, VodClientConfig};
use vod_worker::{AlertSink, Executor, WorkerConfig};

/// Exit codes per the configuration surface: 0 success, 1 generic
/// failure, 2 configuration error, 3 dependency unreachable.
const EXIT_GENERIC_FAILURE: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_DEPENDENCY_UNREACHABLE: i32 = 3;

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vod=info".parse().unwrap()))
        .init();

    info!("starting archivist worker");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid worker configuration");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let cities = match vod_storage::load_registry(&config.cities_config) {
        Ok(cities) => cities,
        Err(e) => {
            error!(error = %e, "invalid CITIES_CONFIG");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let broker = match TaskBroker::from_env() {
        Ok(broker) => broker,
        Err(e) => {
            error!(error = %e, "failed to construct task broker");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    if let Err(e) = broker
        .redis_client()
        .get_multiplexed_async_connection()
        .await
    {
        error!(error = %e, "broker unreachable at startup");
        std::process::exit(EXIT_DEPENDENCY_UNREACHABLE);
    }

    let client = match VodClientConfig::from_env().and_then(VodClient::new) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to construct VOD client");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    match client.test_reachability().await {
        Ok(_) => {}
        Err(e) => warn!(error = %e, "VOD upstream unreachable at startup, continuing"),
    }

    let alerts = Arc::new(AlertSink::from_env());

    let executor = match Executor::new(config, broker, client, cities, alerts) {
        Ok(executor) => Arc::new(executor),
        Err(e) => {
            error!(error = %e, "failed to construct executor");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let shutdown_executor = Arc::clone(&executor);
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        shutdown_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!(error = %e, "executor error");
        std::process::exit(EXIT_GENERIC_FAILURE);
    }

    shutdown_handle.await.ok();
    info!("worker shutdown complete");
}
