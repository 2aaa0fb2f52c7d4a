//! Documented `/comments` routes. The work happens in [`super::resource`].

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
use crate::models::Comment;

/// List all comments
#[utoipa::path(
    get,
    path = "/comments",
    responses(
        (status = 200, description = "Every stored comment", body = [Comment]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Comments"
)]
pub async fn list_comments(
    state: State<ResourceState>,
) -> Result<Json<Vec<Map<String, Value>>>, AppError> {
    resource::list(state).await
}

/// Create a comment
#[utoipa::path(
    post,
    path = "/comments",
    request_body = Comment,
    responses(
        (status = 201, description = "Comment created; Location and ETag are set", body = Comment),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 409, description = "Requested _key is taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Comments"
)]
pub async fn create_comment(
    state: State<ResourceState>,
    headers: HeaderMap,
    payload: NewPayload<Comment>,
) -> Result<Response, AppError> {
    resource::create(state, headers, payload).await
}

/// Fetch a comment
#[utoipa::path(
    get,
    path = "/comments/{key}",
    params(
        ("key" = String, Path, description = "Comment key")
    ),
    responses(
        (status = 200, description = "Comment found", body = Comment),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Comments"
)]
pub async fn get_comment(
    state: State<ResourceState>,
    key: Path<String>,
) -> Result<Response, AppError> {
    resource::detail(state, key).await
}

/// Replace a comment
#[utoipa::path(
    put,
    path = "/comments/{key}",
    params(
        ("key" = String, Path, description = "Comment key"),
        ("If-Match" = Option<String>, Header, description = "Expected ETag(s); weak tags never match")
    ),
    request_body = Comment,
    responses(
        (status = 200, description = "Comment replaced", body = Comment),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 409, description = "Revision mismatch", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Comments"
)]
pub async fn replace_comment(
    state: State<ResourceState>,
    key: Path<String>,
    if_match: IfMatch,
    payload: ClientPayload<Comment>,
) -> Result<Response, AppError> {
    resource::replace(state, key, if_match, payload).await
}

/// Patch a comment
#[utoipa::path(
    patch,
    path = "/comments/{key}",
    params(
        ("key" = String, Path, description = "Comment key"),
        ("If-Match" = Option<String>, Header, description = "Expected ETag(s); weak tags never match")
    ),
    request_body(content = Object, description = "Fields to merge into the stored comment"),
    responses(
        (status = 200, description = "Comment after the merge", body = Comment),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 409, description = "Revision mismatch", body = ErrorResponse),
        (status = 422, description = "Empty patch or forbidden field name", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Comments"
)]
pub async fn update_comment(
    state: State<ResourceState>,
    key: Path<String>,
    if_match: IfMatch,
    patch: PatchPayload,
) -> Result<Response, AppError> {
    resource::update(state, key, if_match, patch).await
}

/// Delete a comment
#[utoipa::path(
    delete,
    path = "/comments/{key}",
    params(
        ("key" = String, Path, description = "Comment key"),
        ("If-Match" = Option<String>, Header, description = "Expected ETag(s); weak tags never match")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Comment not found", body = ErrorResponse),
        (status = 409, description = "Revision mismatch", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Comments"
)]
pub async fn delete_comment(
    state: State<ResourceState>,
    key: Path<String>,
    if_match: IfMatch,
) -> Result<StatusCode, AppError> {
    resource::remove(state, key, if_match).await
}

/// Routes relative to the `/comments` mount point.
pub fn router(state: ResourceState) -> Router {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route(
            "/:key",
            get(get_comment)
                .put(replace_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .with_state(state)
}
