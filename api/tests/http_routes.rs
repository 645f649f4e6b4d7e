//! HTTP route tests.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use tickcast_api::{create_router, AppState, HubStatus};
use tickcast_hub::{ConnectionConfig, Hub, HubConfig};

fn test_server(hub: &Hub) -> TestServer {
    let state = AppState::new(hub.clone(), ConnectionConfig::default());
    TestServer::new(create_router(state)).expect("test server")
}

#[tokio::test]
async fn test_status_reports_connected_clients() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let server = test_server(&hub);

    let response = server.get("/hub/status").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<HubStatus>(),
        HubStatus {
            connected_clients: 0,
            status: "operational".to_string(),
        }
    );

    let (client, _rx) = hub.new_client(None);
    tokio_test::assert_ok!(hub.register(client));

    let body: Value = server.get("/hub/status").await.json();
    assert_eq!(body["connected_clients"], 1);
    assert_eq!(body["status"], "operational");
}

#[tokio::test]
async fn test_status_unavailable_after_shutdown() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let server = test_server(&hub);
    hub.shutdown().await;

    let response = server.get("/hub/status").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["status"], "unavailable");
}

#[tokio::test]
async fn test_metrics_snapshot() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let server = test_server(&hub);

    let (client, _rx) = hub.new_client(None);
    hub.register(client).expect("register");
    hub.client_count().await.expect("settle");

    let response = server.get("/hub/metrics").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["clients_registered"], 1);
    assert_eq!(body["active_clients"], 1);
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn test_health() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let server = test_server(&hub);

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route() {
    let (hub, _handle) = Hub::spawn(HubConfig::default()).expect("hub");
    let server = test_server(&hub);

    server
        .get("/hub/unknown")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
