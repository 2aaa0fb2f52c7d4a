//! The six document operations shared by every resource. Each resource
//! module documents and routes them under its own paths.
//!
//! | Method | Path    | Store call             |
//! |--------|---------|------------------------|
//! | GET    | `/`     | `all`                  |
//! | POST   | `/`     | `save`                 |
//! | GET    | `/:key` | `document`             |
//! | PUT    | `/:key` | `replace`              |
//! | PATCH  | `/:key` | `update` + `document`  |
//! | DELETE | `/:key` | `remove`               |

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::sync::Arc;

use super::extract::{etag, ClientPayload, IfMatch, NewPayload, PatchPayload};
use crate::models::{for_client, Resource};
use crate::services::{record_store_operation, DocumentCollection, StoreError, StoreResult};

#[derive(Clone)]
pub struct ResourceState {
    collection: Arc<dyn DocumentCollection>,
    mount_path: String,
    public_url: Option<String>,
}

impl ResourceState {
    /// State for resource `R`, served under [`Resource::mount_path`].
    pub fn new<R: Resource>(
        collection: Arc<dyn DocumentCollection>,
        public_url: Option<String>,
    ) -> Self {
        Self {
            collection,
            mount_path: R::mount_path(),
            public_url,
        }
    }

    fn observe<T>(&self, operation: &'static str, result: &StoreResult<T>) {
        record_store_operation(self.collection.name(), operation, result);
    }

    /// Narrows `If-Match` to the single revision the store checks. A list
    /// needs a read to pick the current entry; the write still checks it,
    /// so a change in between is a conflict.
    async fn expected_rev(&self, key: &str, if_match: &IfMatch) -> Result<Option<String>, AppError> {
        let IfMatch::Revisions(revisions) = if_match else {
            return Ok(None);
        };
        if let [revision] = revisions.as_slice() {
            return Ok(Some(revision.clone()));
        }

        let result = self.collection.document(key).await;
        self.observe("document", &result);
        let current = result?.meta.rev;

        if revisions.contains(&current) {
            Ok(Some(current))
        } else {
            Err(StoreError::version_conflict(self.collection.name(), key, &revisions.join(", ")).into())
        }
    }

    /// Absolute URL of the detail route when a base is known, else the path.
    fn location(&self, headers: &HeaderMap, key: &str) -> String {
        let path = format!("{}/{}", self.mount_path, key);

        if let Some(base) = &self.public_url {
            return format!("{}{}", base, path);
        }

        match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => {
                let scheme = headers
                    .get("x-forwarded-proto")
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("http");
                format!("{}://{}{}", scheme, host, path)
            }
            None => path,
        }
    }
}

fn to_body<R: Resource>(record: &R) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(_) => Err(AppError::InternalError(anyhow::anyhow!(
            "{} did not serialize to an object",
            R::LABEL
        ))),
        Err(e) => Err(AppError::InternalError(e.into())),
    }
}

fn with_headers(
    mut response: Response,
    pairs: &[(header::HeaderName, &str)],
) -> Result<Response, AppError> {
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("invalid {} header: {}", name, e))
        })?;
        response.headers_mut().insert(name.clone(), value);
    }
    Ok(response)
}

/// List all documents.
///
/// GET /
pub async fn list(
    State(state): State<ResourceState>,
) -> Result<Json<Vec<Map<String, Value>>>, AppError> {
    let result = state.collection.all().await;
    state.observe("list", &result);

    let documents = result?
        .into_iter()
        .map(|doc| for_client(doc.into_record()))
        .collect();
    Ok(Json(documents))
}

/// Create a document, honouring a client-requested `_key`.
///
/// POST /
pub async fn create<R: Resource>(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    payload: NewPayload<R>,
) -> Result<Response, AppError> {
    let mut record = to_body(&payload.record)?;

    tracing::info!(
        collection = %state.collection.name(),
        requested_key = ?payload.key,
        "Creating {}",
        R::LABEL
    );

    let result = state.collection.save(payload.key, record.clone()).await;
    state.observe("save", &result);
    let meta = result?;

    meta.merge_into(&mut record);
    let location = state.location(&headers, &meta.key);
    let tag = etag(&meta.rev);
    let response = (StatusCode::CREATED, Json(for_client(record))).into_response();

    with_headers(
        response,
        &[
            (header::LOCATION, location.as_str()),
            (header::ETAG, tag.as_str()),
        ],
    )
}

/// Fetch one document.
///
/// GET /:key
pub async fn detail(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let result = state.collection.document(&key).await;
    state.observe("document", &result);
    let doc = result?;

    let tag = etag(&doc.meta.rev);
    let response = Json(for_client(doc.into_record())).into_response();
    with_headers(response, &[(header::ETAG, tag.as_str())])
}

/// Replace a document wholesale. Never creates.
///
/// PUT /:key
pub async fn replace<R: Resource>(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    if_match: IfMatch,
    payload: ClientPayload<R>,
) -> Result<Response, AppError> {
    let mut record = to_body(&payload.record)?;

    tracing::info!(
        collection = %state.collection.name(),
        key = %key,
        if_match = ?if_match,
        "Replacing {}",
        R::LABEL
    );

    let expected = state.expected_rev(&key, &if_match).await?;
    let result = state
        .collection
        .replace(&key, record.clone(), expected.as_deref())
        .await;
    state.observe("replace", &result);
    let meta = result?;

    meta.merge_into(&mut record);
    let tag = etag(&meta.rev);
    let response = Json(for_client(record)).into_response();
    with_headers(response, &[(header::ETAG, tag.as_str())])
}

/// Shallow-merge a partial body, then return the whole document.
///
/// The patch and the read-back are separate store calls; a delete landing
/// between them surfaces here as 404.
///
/// PATCH /:key
pub async fn update(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    if_match: IfMatch,
    PatchPayload(patch): PatchPayload,
) -> Result<Response, AppError> {
    tracing::info!(
        collection = %state.collection.name(),
        key = %key,
        fields = patch.len(),
        if_match = ?if_match,
        "Patching document"
    );

    let expected = state.expected_rev(&key, &if_match).await?;
    let result = state
        .collection
        .update(&key, patch, expected.as_deref())
        .await;
    state.observe("update", &result);
    result?;

    let result = state.collection.document(&key).await;
    state.observe("document", &result);
    let doc = result?;

    let tag = etag(&doc.meta.rev);
    let response = Json(for_client(doc.into_record())).into_response();
    with_headers(response, &[(header::ETAG, tag.as_str())])
}

/// Delete a document.
///
/// DELETE /:key
pub async fn remove(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    if_match: IfMatch,
) -> Result<StatusCode, AppError> {
    tracing::info!(
        collection = %state.collection.name(),
        key = %key,
        if_match = ?if_match,
        "Removing document"
    );

    let expected = state.expected_rev(&key, &if_match).await?;
    let result = state.collection.remove(&key, expected.as_deref()).await;
    state.observe("remove", &result);
    result?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryCollection;

    fn state(public_url: Option<&str>) -> ResourceState {
        ResourceState {
            collection: Arc::new(InMemoryCollection::new("comments")),
            mount_path: "/comments".to_string(),
            public_url: public_url.map(str::to_string),
        }
    }

    #[test]
    fn location_prefers_public_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));

        assert_eq!(
            state(Some("https://api.example.com")).location(&headers, "k1"),
            "https://api.example.com/comments/k1"
        );
    }

    #[test]
    fn location_falls_back_to_host_then_path() {
        let mut headers = HeaderMap::new();
        assert_eq!(state(None).location(&headers, "k1"), "/comments/k1");

        headers.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
        assert_eq!(
            state(None).location(&headers, "k1"),
            "http://localhost:8080/comments/k1"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            state(None).location(&headers, "k1"),
            "https://localhost:8080/comments/k1"
        );
    }
}
