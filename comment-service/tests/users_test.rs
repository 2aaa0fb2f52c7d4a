mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use std::collections::HashSet;

#[tokio::test]
async fn create_fills_password_and_dates() {
    let app = TestApp::new();

    let response = app
        .post("/users", json!({ "username": "ann", "name": "Ann" }))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response
        .header("location")
        .unwrap()
        .ends_with(&format!("/users/{}", response.id())));

    let password = response.body["password"].as_str().unwrap();
    assert_eq!(password.len(), 8);
    assert_eq!(password.chars().collect::<HashSet<_>>().len(), 8);
    assert_eq!(response.body["admin"], false);
    assert!(response.body["createdDate"].is_string());
    assert!(response.body["modifiedDate"].is_string());
}

#[tokio::test]
async fn each_create_gets_its_own_defaults() {
    let app = TestApp::new();
    let user = json!({ "username": "ann", "name": "Ann" });

    let first = app.post("/users", user.clone()).await;
    let second = app.post("/users", user).await;

    assert_ne!(first.id(), second.id());
    assert_ne!(first.body["password"], second.body["password"]);
}

#[tokio::test]
async fn explicit_empty_password_is_kept() {
    let app = TestApp::new();

    let response = app
        .post(
            "/users",
            json!({ "username": "ann", "name": "Ann", "password": "", "admin": true }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["password"], "");
    assert_eq!(response.body["admin"], true);
}

#[tokio::test]
async fn invalid_user_lists_every_violation() {
    let app = TestApp::new();

    let response = app.post("/users", json!({ "password": "hunter2" })).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = response.body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "password", "username"]);
    assert_eq!(app.get("/users").await.body, json!([]));
}

#[tokio::test]
async fn users_and_comments_are_separate_collections() {
    let app = TestApp::new();
    let id = app
        .post("/users", json!({ "_key": "ann", "username": "ann", "name": "Ann" }))
        .await
        .id();

    assert_eq!(app.get(&format!("/users/{}", id)).await.status, StatusCode::OK);
    assert_eq!(
        app.get(&format!("/comments/{}", id)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn invalid_requested_key_is_a_violation() {
    let app = TestApp::new();

    let response = app
        .post(
            "/users",
            json!({ "_key": "has space", "username": "ann", "name": "Ann" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["violations"][0]["field"], "_key");
}

#[tokio::test]
async fn date_only_values_are_read_as_midnight_utc() {
    let app = TestApp::new();

    let response = app
        .post(
            "/users",
            json!({ "username": "ann", "name": "Ann", "createdDate": "2020-01-02" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["createdDate"], "2020-01-02T00:00:00Z");

    let response = app
        .post(
            "/users",
            json!({ "username": "bob", "name": "Bob", "createdDate": "yesterday" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
