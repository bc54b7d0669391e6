//! Resource Optimization dashboard
//!
//! Serves the systems table and the per-system recommendations panel
//! over HTTP, backed by the ROS API and the inventory service.

use anyhow::{Context, Result};
use ros_lib::{
    client::{ApiClient, ClientConfig, RosApi},
    health::{components, HealthRegistry},
    inventory::{HttpInventoryProvider, InventoryProvider},
    observability::{RosMetrics, StructuredLogger},
    StaticUserResolver,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting ros-dashboard");

    let config = config::DashboardConfig::load()?;
    info!(
        api_url = %config.api_url,
        inventory_url = ?config.inventory_url,
        user = %config.username,
        "Dashboard configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ROS_API).await;

    // Registers the metric families before the first scrape
    let _metrics = RosMetrics::new();

    let logger = StructuredLogger::new("dashboard");
    logger.log_startup(DASHBOARD_VERSION, &config.api_url);

    let client_config = |url: &str| {
        ClientConfig::new(url)
            .with_token(config.token.clone())
            .with_timeout(config.request_timeout())
    };

    let ros_client = ApiClient::with_config(client_config(&config.api_url))
        .context("Invalid ROS API URL")?;
    let api: Arc<dyn RosApi> = Arc::new(api::Tracked::new(
        ros_client,
        health_registry.clone(),
        components::ROS_API,
    ));

    let inventory: Option<Arc<dyn InventoryProvider>> = match &config.inventory_url {
        Some(url) => {
            health_registry.register(components::INVENTORY).await;
            let client =
                ApiClient::with_config(client_config(url)).context("Invalid inventory URL")?;
            let provider: Arc<dyn InventoryProvider> = Arc::new(api::Tracked::new(
                HttpInventoryProvider::new(client),
                health_registry.clone(),
                components::INVENTORY,
            ));
            Some(provider)
        }
        None => None,
    };

    let users = Arc::new(StaticUserResolver::from_username(config.username.clone()));
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        api,
        users,
        config.default_per_page,
    ));
    app_state.systems.on_load(inventory).await;

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        result = api_handle => {
            result.context("Dashboard server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
