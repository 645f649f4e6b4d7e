//! Tickcast API server binary.
//!
//! Entry point for the WebSocket and HTTP server.

use anyhow::Context;
use tickcast_api::{AppState, Server, ServerConfig};
use tickcast_hub::Hub;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tickcast_hub=debug,tickcast_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().context("invalid configuration")?;

    let (hub, hub_task) = Hub::spawn(config.hub).context("failed to start hub")?;
    let state = AppState::new(hub, config.connection);

    tracing::info!(
        "Starting Tickcast API server on {} (mailbox capacity {}, dispatch buffer {})",
        config.addr(),
        config.hub.mailbox_capacity,
        config.hub.dispatch_buffer
    );

    let server = Server::new(config, state);
    server
        .run(shutdown_signal())
        .await
        .context("server error")?;

    hub_task.await.context("hub task failed")?;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
