//! AC power meter service (metersrv)
//!
//! Polls a Modbus TCP power meter and exports the readings to Prometheus.

use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::sync::Mutex;
use tracing::{error, info};

use common::service_bootstrap::{self, ServiceInfo};
use meter_protocols::ProtocolClient;
use metersrv::{
    api::{create_router, AppState},
    config::DEFAULT_API_PORT,
    control,
    metrics::MeterMetrics,
    Cli, MeterSrvConfig, Poller, PollerConfig, PollerStats, TelemetryCache, SERVICE_NAME,
    SERVICE_VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let service_info = ServiceInfo::new(
        SERVICE_NAME,
        "AC Power Meter Poller - Modbus TCP to Prometheus",
        DEFAULT_API_PORT,
    )
    .with_version(SERVICE_VERSION);

    let config_path = cli.common.config_path(SERVICE_NAME);
    let figment = cli.apply(MeterSrvConfig::figment(&config_path));
    let config = MeterSrvConfig::from_figment(figment)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    service_bootstrap::init_logging(&service_info, &cli.common, config.logging.dir.clone())?;
    if !cli.common.no_color {
        service_bootstrap::print_startup_banner(&service_info);
    }

    config.validate()?;
    if cli.common.validate {
        info!("Configuration valid: {}", config_path.display());
        return Ok(());
    }

    info!(
        "Meter at {}:{} (unit {}), device id {}",
        config.device.host,
        config.device.port,
        config.device.unit_id,
        config.device_id()
    );

    let client = Arc::new(Mutex::new(ProtocolClient::new(
        config.connection_params(),
        config.device.unit_id,
    )));
    let cache = Arc::new(TelemetryCache::new());
    let stats = Arc::new(PollerStats::default());

    control::run_startup_actions(
        &client,
        &cache,
        cli.startup_actions(),
        config.polling.threshold_address,
    )
    .await;

    let shutdown_token = common::shutdown::shutdown_token();

    let poller = Poller::new(
        Arc::clone(&client),
        Arc::clone(&cache),
        Arc::clone(&stats),
        PollerConfig {
            interval: config.poll_interval(),
            threshold_address: config.polling.threshold_address,
            console: !config.api.enabled,
        },
    );
    let poller_handle = tokio::spawn(poller.run(shutdown_token.child_token()));

    let server_handle = if config.api.enabled {
        let addr = config.api_addr()?;
        let state = AppState {
            client: Arc::clone(&client),
            cache: Arc::clone(&cache),
            stats: Arc::clone(&stats),
            metrics: Arc::new(MeterMetrics::new(config.device_id())?),
            threshold_address: config.polling.threshold_address,
            service_name: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            started_at: chrono::Utc::now(),
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        info!("API server listening on http://{}", addr);
        info!("Metrics: http://{}/metrics", addr);

        let server = serve(listener, create_router(state));
        let server_token = shutdown_token.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = server
                .with_graceful_shutdown(server_token.cancelled_owned())
                .await
            {
                error!("Server error: {}", e);
            }
        }))
    } else {
        info!("Web server disabled, printing readings to the console");
        None
    };

    shutdown_token.cancelled().await;
    info!("Shutting down {}", SERVICE_NAME);

    if let Err(e) = poller_handle.await {
        error!("Poller task failed: {}", e);
    }
    if let Some(handle) = server_handle {
        if let Err(e) = handle.await {
            error!("Server task failed: {}", e);
        }
    }

    info!("{} stopped", SERVICE_NAME);
    Ok(())
}
