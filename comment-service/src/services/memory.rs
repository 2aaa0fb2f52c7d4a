//! Process-local document store for development and tests.

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::store::{
    DocumentCollection, DocumentMeta, DocumentStore, StoreError, StoreResult, StoredDocument,
    generate_key, new_revision,
};
use crate::models::transform::strip_store_fields;

#[derive(Debug, Clone)]
struct StoredEntry {
    rev: String,
    body: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: DashMap<String, Arc<InMemoryCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCollection::new(name)))
            .clone()
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Revision checks and writes happen under the shard lock of the entry,
/// so each operation is atomic with respect to the others.
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    docs: DashMap<String, StoredEntry>,
}

impl InMemoryCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: DashMap::new(),
        }
    }

    fn meta(&self, key: &str, rev: String, old_rev: Option<String>) -> DocumentMeta {
        DocumentMeta::new(&self.name, key, rev, old_rev)
    }

    fn check_rev(&self, key: &str, current: &str, expected: Option<&str>) -> StoreResult<()> {
        match expected {
            Some(expected) if expected != current => {
                Err(StoreError::version_conflict(&self.name, key, expected))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn all(&self) -> StoreResult<Vec<StoredDocument>> {
        Ok(self
            .docs
            .iter()
            .map(|entry| StoredDocument {
                meta: self.meta(entry.key(), entry.rev.clone(), None),
                body: entry.body.clone(),
            })
            .collect())
    }

    async fn save(
        &self,
        key: Option<String>,
        mut body: Map<String, Value>,
    ) -> StoreResult<DocumentMeta> {
        strip_store_fields(&mut body);
        let key = key.unwrap_or_else(generate_key);

        match self.docs.entry(key.clone()) {
            Entry::Occupied(_) => Err(StoreError::duplicate_key(&self.name, &key)),
            Entry::Vacant(slot) => {
                let rev = new_revision();
                slot.insert(StoredEntry {
                    rev: rev.clone(),
                    body,
                });
                Ok(self.meta(&key, rev, None))
            }
        }
    }

    async fn document(&self, key: &str) -> StoreResult<StoredDocument> {
        let entry = self
            .docs
            .get(key)
            .ok_or_else(|| StoreError::not_found(&self.name, key))?;

        Ok(StoredDocument {
            meta: self.meta(key, entry.rev.clone(), None),
            body: entry.body.clone(),
        })
    }

    async fn replace(
        &self,
        key: &str,
        mut body: Map<String, Value>,
        expected_rev: Option<&str>,
    ) -> StoreResult<DocumentMeta> {
        strip_store_fields(&mut body);
        let mut entry = self
            .docs
            .get_mut(key)
            .ok_or_else(|| StoreError::not_found(&self.name, key))?;
        self.check_rev(key, &entry.rev, expected_rev)?;

        let rev = new_revision();
        let old_rev = std::mem::replace(&mut entry.rev, rev.clone());
        entry.body = body;
        Ok(self.meta(key, rev, Some(old_rev)))
    }

    async fn update(
        &self,
        key: &str,
        mut patch: Map<String, Value>,
        expected_rev: Option<&str>,
    ) -> StoreResult<DocumentMeta> {
        strip_store_fields(&mut patch);
        let mut entry = self
            .docs
            .get_mut(key)
            .ok_or_else(|| StoreError::not_found(&self.name, key))?;
        self.check_rev(key, &entry.rev, expected_rev)?;

        entry.body.extend(patch);
        let rev = new_revision();
        let old_rev = std::mem::replace(&mut entry.rev, rev.clone());
        Ok(self.meta(key, rev, Some(old_rev)))
    }

    async fn remove(&self, key: &str, expected_rev: Option<&str>) -> StoreResult<DocumentMeta> {
        match self.docs.entry(key.to_string()) {
            Entry::Vacant(_) => Err(StoreError::not_found(&self.name, key)),
            Entry::Occupied(slot) => {
                self.check_rev(key, &slot.get().rev, expected_rev)?;
                let (_, removed) = slot.remove_entry();
                Ok(self.meta(key, removed.rev, None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn save_assigns_key_and_revision() {
        let comments = InMemoryCollection::new("comments");
        let meta = comments.save(None, body(json!({ "text": "hi" }))).await.unwrap();

        assert!(!meta.key.is_empty());
        assert_eq!(meta.id, format!("comments/{}", meta.key));

        let doc = comments.document(&meta.key).await.unwrap();
        assert_eq!(doc.meta.rev, meta.rev);
        assert_eq!(Value::Object(doc.body), json!({ "text": "hi" }));
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected() {
        let comments = InMemoryCollection::new("comments");
        comments.save(Some("k1".into()), Map::new()).await.unwrap();

        let err = comments.save(Some("k1".into()), Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn replace_never_creates() {
        let comments = InMemoryCollection::new("comments");
        let err = comments.replace("ghost", Map::new(), None).await.unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(comments.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_revision_conflicts_and_changes_nothing() {
        let comments = InMemoryCollection::new("comments");
        let first = comments
            .save(Some("k1".into()), body(json!({ "text": "v1" })))
            .await
            .unwrap();
        let second = comments
            .replace("k1", body(json!({ "text": "v2" })), Some(&first.rev))
            .await
            .unwrap();
        assert_eq!(second.old_rev.as_deref(), Some(first.rev.as_str()));

        let err = comments
            .update("k1", body(json!({ "text": "v3" })), Some(&first.rev))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let err = comments.remove("k1", Some(&first.rev)).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let doc = comments.document("k1").await.unwrap();
        assert_eq!(doc.meta.rev, second.rev);
        assert_eq!(doc.body["text"], "v2");
    }

    #[tokio::test]
    async fn update_is_a_shallow_merge() {
        let comments = InMemoryCollection::new("comments");
        comments
            .save(
                Some("k1".into()),
                body(json!({ "text": "hi", "meta": { "a": 1, "b": 2 } })),
            )
            .await
            .unwrap();

        comments
            .update("k1", body(json!({ "meta": { "a": 5 }, "_key": "evil" })), None)
            .await
            .unwrap();

        let doc = comments.document("k1").await.unwrap();
        assert_eq!(
            Value::Object(doc.body),
            json!({ "text": "hi", "meta": { "a": 5 } })
        );
    }

    #[tokio::test]
    async fn remove_then_fetch_is_not_found() {
        let comments = InMemoryCollection::new("comments");
        let meta = comments.save(None, Map::new()).await.unwrap();

        comments.remove(&meta.key, Some(&meta.rev)).await.unwrap();

        assert!(matches!(
            comments.document(&meta.key).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
        assert!(matches!(
            comments.remove(&meta.key, None).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn store_hands_out_shared_collections() {
        let store = InMemoryStore::new();
        store
            .collection("users")
            .save(Some("u1".into()), Map::new())
            .await
            .unwrap();

        assert_eq!(store.collection("users").all().await.unwrap().len(), 1);
        assert!(store.collection("comments").all().await.unwrap().is_empty());
    }
}
