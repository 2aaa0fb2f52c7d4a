#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use comment_service::config::CommentConfig;
use comment_service::services::{DocumentStore, InMemoryStore};
use comment_service::startup::{build_router, AppState};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Settings for an in-memory deployment, plus any extra variables.
pub fn memory_config(extra: &[(&str, &str)]) -> CommentConfig {
    let mut core = CoreConfig::default();
    core.port = 0;
    core.log_level = "error".to_string();

    CommentConfig::from_lookup(core, |key| {
        if key == "STORE_BACKEND" {
            return Some("memory".to_string());
        }
        extra
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("Failed to build test configuration")
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn DocumentStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(memory_config(&[]))
    }

    pub fn with_config(config: CommentConfig) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let router = build_router(AppState {
            config,
            store: store.clone(),
        });
        TestApp { router, store }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");
        TestResponse::read(response).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(request("GET", uri, None, None)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(request("POST", uri, Some(body), None)).await
    }

    pub async fn put(&self, uri: &str, body: Value, if_match: Option<&str>) -> TestResponse {
        self.send(request("PUT", uri, Some(body), if_match)).await
    }

    pub async fn patch(&self, uri: &str, body: Value, if_match: Option<&str>) -> TestResponse {
        self.send(request("PATCH", uri, Some(body), if_match)).await
    }

    pub async fn delete(&self, uri: &str, if_match: Option<&str>) -> TestResponse {
        self.send(request("DELETE", uri, None, if_match)).await
    }
}

pub fn request(method: &str, uri: &str, body: Option<Value>, if_match: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost:8080");
    if let Some(tag) = if_match {
        builder = builder.header(header::IF_MATCH, tag);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("Failed to build request")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response has no id")
            .to_string()
    }
}
