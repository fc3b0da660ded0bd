//! OBD Share Server
//!
//! Replays a telemetry dataset while sharing is on and serves the
//! dashboard, map and earnings views over HTTP.

use anyhow::{Context, Result};
use obd_server::{api, config::ServerConfig, driver::Driver, state};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting OBD Share Server");

    let config = ServerConfig::from_env();
    let source = config
        .load_source()
        .context("Failed to load reading source")?;
    if source.is_empty() {
        tracing::warn!(
            "Reading source {} is empty; sharing will be refused",
            source.name()
        );
    }

    // Create application state
    let store = state::SessionStore::new(source);
    let driver = Driver::new(store.clone(), config.tick_interval);
    let state = state::AppState::new(store, driver.clone(), config.chart_window);

    // Build the router
    let app = api::create_router(state);

    // Start server
    info!("Server listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    driver.shutdown().await;
    info!("Server stopped");

    Ok(())
}
