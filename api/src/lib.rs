//! Tickcast API - WebSocket and HTTP surface for the broadcast hub.
//!
//! # Endpoints
//!
//! - `GET /ws` - WebSocket upgrade; optional `user_id` query parameter
//! - `GET /hub/status` - connected client count
//! - `GET /hub/metrics` - hub counters
//! - `GET /health` - liveness probe

pub mod config;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use config::{ServerConfig, ServerConfigError};
pub use routes::{create_router, HubStatus};
pub use server::{serve, Server};
pub use state::AppState;
