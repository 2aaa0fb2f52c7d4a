mod common;

use axum::http::StatusCode;
use comment_service::services::init_metrics;
use comment_service::startup::Application;
use common::{memory_config, TestApp};
use reqwest::Client;
use serde_json::json;
use std::sync::Once;

// Initialize metrics once for all tests
static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        init_metrics().ok();
    });
}

async fn spawn_app() -> String {
    let app = Application::build(memory_config(&[]))
        .await
        .expect("Failed to build test application");
    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    // Wait for the listener by polling the health endpoint
    let client = Client::new();
    for _ in 0..50 {
        if client.get(format!("{}/health", address)).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    address
}

#[tokio::test]
async fn health_check_works() {
    let address = spawn_app().await;

    let response = Client::new()
        .get(format!("{}/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "comment-service");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::new();

    let response = app.get("/ready").await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn served_over_tcp_end_to_end() {
    let address = spawn_app().await;
    let client = Client::new();

    let created = client
        .post(format!("{}/comments", address))
        .json(&json!({ "text": "over the wire" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(created.status().as_u16(), 201);

    let location = created
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Missing location header")
        .to_string();
    assert!(location.starts_with(&format!("{}/comments/", address)));

    let fetched: serde_json::Value = client
        .get(&location)
        .send()
        .await
        .expect("Failed to follow location")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(fetched["text"], "over the wire");
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_format() {
    ensure_metrics_initialized();
    let app = TestApp::new();
    app.post("/comments", json!({ "text": "counted" })).await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    let content_type = response
        .header("content-type")
        .expect("Missing content-type header");
    assert!(content_type.starts_with("text/plain"));
}
