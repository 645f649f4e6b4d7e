//! HTTP routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws::ws_handler;

/// Hub status as reported by `GET /hub/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStatus {
    /// Number of registered clients.
    pub connected_clients: usize,
    /// `operational` while the hub runs, `unavailable` after it stops.
    pub status: String,
}

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/hub/status", get(hub_status))
        .route("/hub/metrics", get(hub_metrics))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn hub_status(State(state): State<AppState>) -> Response {
    match state.hub.client_count().await {
        Ok(connected_clients) => Json(HubStatus {
            connected_clients,
            status: "operational".to_string(),
        })
        .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HubStatus {
                connected_clients: 0,
                status: "unavailable".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn hub_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.metrics().snapshot())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
