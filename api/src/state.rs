//! Application state shared across handlers.

use tickcast_hub::{Broadcaster, ConnectionConfig, Hub};
use tokio_util::task::TaskTracker;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Hub handle.
    pub hub: Hub,

    /// Typed publisher for producers running in this process.
    pub broadcaster: Broadcaster,

    /// Settings applied to every new connection.
    pub connection: ConnectionConfig,

    /// Live WebSocket connection tasks. Shutdown waits for it to empty.
    pub connections: TaskTracker,
}

impl AppState {
    /// Creates the state around a running hub.
    #[must_use]
    pub fn new(hub: Hub, connection: ConnectionConfig) -> Self {
        Self {
            broadcaster: Broadcaster::new(hub.clone()),
            hub,
            connection,
            connections: TaskTracker::new(),
        }
    }
}
