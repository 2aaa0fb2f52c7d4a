//! Documented `/users` routes. The work happens in [`super::resource`].

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use service_core::error::{AppError, ErrorResponse};

use super::extract::{ClientPayload, IfMatch, NewPayload, PatchPayload};
use super::resource::{self, ResourceState};
use crate::models::User;

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Every stored user", body = [User]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn list_users(
    state: State<ResourceState>,
) -> Result<Json<Vec<Map<String, Value>>>, AppError> {
    resource::list(state).await
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    request_body = User,
    responses(
        (status = 201, description = "User created; Location and ETag are set", body = User),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 409, description = "Requested _key is taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn create_user(
    state: State<ResourceState>,
    headers: HeaderMap,
    payload: NewPayload<User>,
) -> Result<Response, AppError> {
    resource::create(state, headers, payload).await
}

/// Fetch a user
#[utoipa::path(
    get,
    path = "/users/{key}",
    params(
        ("key" = String, Path, description = "User key")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn get_user(
    state: State<ResourceState>,
    key: Path<String>,
) -> Result<Response, AppError> {
    resource::detail(state, key).await
}

/// Replace a user
#[utoipa::path(
    put,
    path = "/users/{key}",
    params(
        ("key" = String, Path, description = "User key"),
        ("If-Match" = Option<String>, Header, description = "Expected ETag(s); weak tags never match")
    ),
    request_body = User,
    responses(
        (status = 200, description = "User replaced", body = User),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Revision mismatch", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn replace_user(
    state: State<ResourceState>,
    key: Path<String>,
    if_match: IfMatch,
    payload: ClientPayload<User>,
) -> Result<Response, AppError> {
    resource::replace(state, key, if_match, payload).await
}

/// Patch a user
#[utoipa::path(
    patch,
    path = "/users/{key}",
    params(
        ("key" = String, Path, description = "User key"),
        ("If-Match" = Option<String>, Header, description = "Expected ETag(s); weak tags never match")
    ),
    request_body(content = Object, description = "Fields to merge into the stored user"),
    responses(
        (status = 200, description = "User after the merge", body = User),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Revision mismatch", body = ErrorResponse),
        (status = 422, description = "Empty patch or forbidden field name", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn update_user(
    state: State<ResourceState>,
    key: Path<String>,
    if_match: IfMatch,
    patch: PatchPayload,
) -> Result<Response, AppError> {
    resource::update(state, key, if_match, patch).await
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{key}",
    params(
        ("key" = String, Path, description = "User key"),
        ("If-Match" = Option<String>, Header, description = "Expected ETag(s); weak tags never match")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Revision mismatch", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn delete_user(
    state: State<ResourceState>,
    key: Path<String>,
    if_match: IfMatch,
) -> Result<StatusCode, AppError> {
    resource::remove(state, key, if_match).await
}

/// Routes relative to the `/users` mount point.
pub fn router(state: ResourceState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:key",
            get(get_user)
                .put(replace_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .with_state(state)
}
