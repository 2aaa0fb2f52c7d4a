//! Storage-access interface for document collections.
//!
//! Every operation returns one of a closed set of outcomes
//! ([`StoreError`]); the HTTP layer maps them exhaustively.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::transform::{ID_FIELD, KEY_FIELD, OLD_REV_FIELD, REV_FIELD};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{key}")]
    NotFound { collection: String, key: String },

    #[error("unique constraint violated: {collection}/{key} already exists")]
    DuplicateKey { collection: String, key: String },

    /// The caller's revision is stale. Re-read and retry.
    #[error("revision conflict on {collection}/{key}: expected {expected}")]
    VersionConflict {
        collection: String,
        key: String,
        expected: String,
    },

    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, key: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn duplicate_key(collection: &str, key: &str) -> Self {
        StoreError::DuplicateKey {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn version_conflict(collection: &str, key: &str, expected: &str) -> Self {
        StoreError::VersionConflict {
            collection: collection.to_string(),
            key: key.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Metric label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::DuplicateKey { .. } => "duplicate_key",
            StoreError::VersionConflict { .. } => "version_conflict",
            StoreError::Unclassified(_) => "error",
        }
    }
}

/// Store-assigned metadata returned by every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    /// Fully qualified handle, `collection/key`.
    pub id: String,
    pub key: String,
    pub rev: String,
    pub old_rev: Option<String>,
}

impl DocumentMeta {
    pub fn new(collection: &str, key: &str, rev: String, old_rev: Option<String>) -> Self {
        Self {
            id: format!("{}/{}", collection, key),
            key: key.to_string(),
            rev,
            old_rev,
        }
    }

    /// Copies the metadata onto a record, overwriting any stale values.
    pub fn merge_into(&self, record: &mut Map<String, Value>) {
        record.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        record.insert(KEY_FIELD.to_string(), Value::String(self.key.clone()));
        record.insert(REV_FIELD.to_string(), Value::String(self.rev.clone()));
        match &self.old_rev {
            Some(old) => {
                record.insert(OLD_REV_FIELD.to_string(), Value::String(old.clone()));
            }
            None => {
                record.remove(OLD_REV_FIELD);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub meta: DocumentMeta,
    /// User fields only; metadata lives in `meta`.
    pub body: Map<String, Value>,
}

impl StoredDocument {
    /// The full internal record: body plus metadata fields.
    pub fn into_record(self) -> Map<String, Value> {
        let mut record = self.body;
        self.meta.merge_into(&mut record);
        record
    }
}

/// Handle on one named collection.
///
/// Bodies passed in must not contain metadata fields; implementations
/// ignore them if they do. `expected_rev` of `None` skips the revision
/// check.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &str;

    /// All documents, in no particular order.
    async fn all(&self) -> StoreResult<Vec<StoredDocument>>;

    /// Inserts a document under `key`, or a generated key when `None`.
    async fn save(&self, key: Option<String>, body: Map<String, Value>)
        -> StoreResult<DocumentMeta>;

    async fn document(&self, key: &str) -> StoreResult<StoredDocument>;

    /// Swaps the whole body; never creates.
    async fn replace(
        &self,
        key: &str,
        body: Map<String, Value>,
        expected_rev: Option<&str>,
    ) -> StoreResult<DocumentMeta>;

    /// Shallow merge of `patch` into the stored body.
    async fn update(
        &self,
        key: &str,
        patch: Map<String, Value>,
        expected_rev: Option<&str>,
    ) -> StoreResult<DocumentMeta>;

    async fn remove(&self, key: &str, expected_rev: Option<&str>) -> StoreResult<DocumentMeta>;
}

/// A document database holding named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;

    async fn health_check(&self) -> StoreResult<()>;
}

pub fn generate_key() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn new_revision() -> String {
    format!("_{}", Uuid::new_v4().simple())
}

/// Document keys accepted from clients. Mirrors the usual document-store
/// rules: 1 to 254 characters from a URL-safe set.
pub fn is_valid_key(key: &str) -> bool {
    const EXTRA: &str = "_-:.@()+,=;$!*'";
    !key.is_empty()
        && key.len() <= 254
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c))
}
