//! WebSocket connection handler.
//!
//! Provides the upgrade handler and the glue between the axum socket and a
//! hub connection.

use std::future;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tickcast_hub::{Connection, Frame};
use tracing::{info, warn};

use super::frames::{from_message, to_message};
use crate::state::AppState;

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Authenticated user, forwarded by the upstream proxy. Logged only.
    pub user_id: Option<String>,
}

/// WebSocket upgrade handler.
///
/// Refuses the upgrade with 503 once the hub has stopped.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    if state.hub.is_closed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "hub unavailable").into_response();
    }

    let connections = state.connections.clone();
    ws.on_upgrade(move |socket| {
        connections.track_future(handle_connection(socket, params.user_id, state))
    })
}

/// Runs one upgraded socket until either side closes it.
async fn handle_connection(socket: WebSocket, user_id: Option<String>, state: AppState) {
    let connection = Connection::new(state.hub.clone(), user_id, state.connection);
    let id = connection.id().clone();
    info!(client_id = %id, "WebSocket connection opened");

    let (sender, receiver) = socket.split();
    let sink = Box::pin(sender.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_message(frame)))));
    let stream = receiver.map(|message| message.map(from_message));

    match connection.run(sink, stream).await {
        Ok(()) => info!(client_id = %id, "WebSocket connection closed"),
        Err(e) => warn!(client_id = %id, "WebSocket connection refused: {}", e),
    }
}
