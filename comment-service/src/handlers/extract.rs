//! Request extractors shared by the resource routes.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use serde_json::{Map, Value};
use service_core::error::AppError;
use validator::{ValidationError, ValidationErrors};

use crate::models::transform::{from_client, strip_store_fields, KEY_FIELD};
use crate::models::Resource;
use crate::services::store::is_valid_key;

/// A JSON request body that must be an object.
pub struct JsonObject(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(anyhow::anyhow!(rejection.body_text())))?;

        match value {
            Value::Object(map) => Ok(JsonObject(map)),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Expected a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A full resource body for replace: `id` and store fields stripped,
/// schema checked, defaults applied.
pub struct ClientPayload<R> {
    pub record: R,
}

/// A create body. Like [`ClientPayload`], but `_key` may be sent to request
/// a specific document key.
pub struct NewPayload<R> {
    pub key: Option<String>,
    pub record: R,
}

#[async_trait]
impl<R, S> FromRequest<S> for ClientPayload<R>
where
    R: Resource,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonObject(payload) = JsonObject::from_request(req, state).await?;
        // The path names the document; a body `_key` has no say here.
        let (record, _) = parse_record::<R>(payload, false)?;
        Ok(ClientPayload { record })
    }
}

#[async_trait]
impl<R, S> FromRequest<S> for NewPayload<R>
where
    R: Resource,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonObject(payload) = JsonObject::from_request(req, state).await?;
        let (record, key) = parse_record::<R>(payload, true)?;
        Ok(NewPayload { key, record })
    }
}

/// Runs every check and reports all violations together.
fn parse_record<R: Resource>(
    payload: Map<String, Value>,
    honour_key: bool,
) -> Result<(R, Option<String>), AppError> {
    let mut payload = from_client(payload);
    let mut errors = ValidationErrors::new();

    let requested_key = payload.remove(KEY_FIELD);
    strip_store_fields(&mut payload);

    let key = match requested_key {
        Some(Value::String(key)) if honour_key && is_valid_key(&key) => Some(key),
        Some(_) if honour_key => {
            errors.add(KEY_FIELD, invalid_key());
            None
        }
        _ => None,
    };

    let unknown: Vec<String> = payload
        .keys()
        .filter(|field| !R::FIELDS.contains(&field.as_str()))
        .cloned()
        .collect();
    for field in unknown {
        payload.remove(&field);
        errors.add("body", unknown_field(&field));
    }

    let record: R = serde_json::from_value(Value::Object(payload)).map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Invalid {} payload: {}", R::LABEL, e))
    })?;

    if let Err(schema_errors) = record.validate() {
        for (field, field_errors) in schema_errors.field_errors() {
            for error in field_errors {
                errors.add(field, error.clone());
            }
        }
    }
    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors));
    }

    Ok((record.with_defaults(), key))
}

fn invalid_key() -> ValidationError {
    let mut error = ValidationError::new("key");
    error.message =
        Some("_key must be 1-254 characters of letters, digits or _-:.@()+,=;$!*'".into());
    error
}

fn unknown_field(field: &str) -> ValidationError {
    let mut error = ValidationError::new("unknown_field");
    error.message = Some(format!("'{}' is not allowed", field).into());
    error.add_param("field".into(), &field);
    error
}

/// A partial update body: `id` and store metadata removed.
pub struct PatchPayload(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for PatchPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonObject(payload) = JsonObject::from_request(req, state).await?;
        let mut patch = from_client(payload);
        strip_store_fields(&mut patch);

        // Dotted or `$` names would be read as operators or paths by the store.
        if let Some(bad) = patch
            .keys()
            .find(|k| k.is_empty() || k.starts_with('$') || k.contains('.'))
        {
            let mut error = ValidationError::new("field_name");
            error.message = Some(format!("'{}' is not a valid field name", bad).into());
            let mut errors = ValidationErrors::new();
            errors.add("body", error);
            return Err(AppError::ValidationError(errors));
        }

        Ok(PatchPayload(patch))
    }
}

/// Revision precondition from `If-Match`.
///
/// Comparison is strong, so weak tags (`W/"..."`) never match and are
/// dropped. A header left with no strong tags can only fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfMatch {
    /// No header, or `*`.
    Any,
    Revisions(Vec<String>),
}

impl IfMatch {
    pub fn parse(value: &str) -> Self {
        let mut revisions = Vec::new();
        for tag in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if tag == "*" {
                return IfMatch::Any;
            }
            if tag.starts_with("W/") {
                continue;
            }
            revisions.push(tag.trim_matches('"').to_string());
        }
        IfMatch::Revisions(revisions)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for IfMatch
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let values = parts.headers.get_all(header::IF_MATCH);
        if values.iter().next().is_none() {
            return Ok(IfMatch::Any);
        }

        let mut joined = Vec::new();
        for value in values {
            let value = value
                .to_str()
                .map_err(|_| AppError::BadRequest(anyhow::anyhow!("If-Match must be ASCII")))?;
            joined.push(value);
        }
        Ok(IfMatch::parse(&joined.join(",")))
    }
}

/// `ETag` value for a revision.
pub fn etag(rev: &str) -> String {
    format!("\"{}\"", rev)
}
