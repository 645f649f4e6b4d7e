//! HTTP server lifecycle.

use std::future::Future;
use std::io;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// The API server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a server.
    #[must_use]
    pub const fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn run<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.addr()).await?;
        serve(listener, self.state, shutdown).await
    }
}

/// Serves the router on an already bound listener.
///
/// When `shutdown` resolves the hub is stopped, which closes every open
/// WebSocket with a going-away frame. The call returns once every
/// connection task has finished, or after twice the write deadline if
/// some peer never lets its close frame through.
///
/// # Errors
///
/// Returns an error if serving fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let hub = state.hub.clone();
    let connections = state.connections.clone();
    let grace = state.connection.write_wait * 2;
    let app = create_router(state);

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutting down, closing hub");
            hub.shutdown().await;
        })
        .await?;

    connections.close();
    if timeout(grace, connections.wait()).await.is_err() {
        warn!(
            "{} connections still open after {:?}, giving up",
            connections.len(),
            grace
        );
    }

    info!("Server stopped");
    Ok(())
}
