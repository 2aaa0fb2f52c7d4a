use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    Client as MongoClient, Collection, Database,
};
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::sync::Arc;

use super::store::{
    generate_key, new_revision, DocumentCollection, DocumentMeta, DocumentStore, StoreError,
    StoreResult, StoredDocument,
};
use crate::models::transform::{strip_store_fields, REV_FIELD};

const DUPLICATE_KEY_CODE: i32 = 11000;
const MONGO_ID_FIELD: &str = "_id";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for MongoDb {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MongoCollection {
            name: name.to_string(),
            inner: self.db.collection(name),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                StoreError::Unclassified(e.into())
            })?;
        Ok(())
    }
}

/// Documents are stored as `{ _id: <key>, _rev: <rev>, ...body }`.
pub struct MongoCollection {
    name: String,
    inner: Collection<Document>,
}

impl MongoCollection {
    fn to_bson(&self, key: &str, rev: &str, mut body: Map<String, Value>) -> StoreResult<Document> {
        strip_store_fields(&mut body);
        body.remove(MONGO_ID_FIELD);

        let mut document = bson::to_document(&body).map_err(|e| {
            StoreError::Unclassified(anyhow::anyhow!(
                "{}/{} is not representable as BSON: {}",
                self.name,
                key,
                e
            ))
        })?;
        document.insert(MONGO_ID_FIELD, key);
        document.insert(REV_FIELD, rev);
        Ok(document)
    }

    fn from_bson(&self, mut document: Document) -> StoreResult<StoredDocument> {
        let key = match document.remove(MONGO_ID_FIELD) {
            Some(Bson::String(key)) => key,
            Some(other) => other.to_string(),
            None => {
                return Err(StoreError::Unclassified(anyhow::anyhow!(
                    "document in {} has no _id",
                    self.name
                )))
            }
        };
        let rev = match document.remove(REV_FIELD) {
            Some(Bson::String(rev)) => rev,
            _ => String::new(),
        };

        let body = match Bson::Document(document).into_relaxed_extjson() {
            Value::Object(body) => body,
            _ => Map::new(),
        };

        Ok(StoredDocument {
            meta: DocumentMeta::new(&self.name, &key, rev, None),
            body,
        })
    }

    fn filter(key: &str, expected_rev: Option<&str>) -> Document {
        let mut filter = doc! { "_id": key };
        if let Some(rev) = expected_rev {
            filter.insert(REV_FIELD, rev);
        }
        filter
    }

    fn previous_rev(document: &Document) -> Option<String> {
        document.get_str(REV_FIELD).ok().map(str::to_string)
    }

    /// A filtered write matched nothing: tell a missing document apart from
    /// a stale revision.
    async fn miss(&self, key: &str, expected_rev: Option<&str>) -> StoreError {
        let Some(expected) = expected_rev else {
            return StoreError::not_found(&self.name, key);
        };

        match self
            .inner
            .count_documents(doc! { "_id": key }, None)
            .await
        {
            Ok(0) => StoreError::not_found(&self.name, key),
            Ok(_) => StoreError::version_conflict(&self.name, key, expected),
            Err(e) => StoreError::Unclassified(e.into()),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn all(&self) -> StoreResult<Vec<StoredDocument>> {
        let cursor = self
            .inner
            .find(doc! {}, None)
            .await
            .map_err(|e| StoreError::Unclassified(e.into()))?;
        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| StoreError::Unclassified(e.into()))?;

        documents
            .into_iter()
            .map(|document| self.from_bson(document))
            .collect()
    }

    async fn save(
        &self,
        key: Option<String>,
        body: Map<String, Value>,
    ) -> StoreResult<DocumentMeta> {
        let key = key.unwrap_or_else(generate_key);
        let rev = new_revision();
        let document = self.to_bson(&key, &rev, body)?;

        match self.inner.insert_one(document, None).await {
            Ok(_) => Ok(DocumentMeta::new(&self.name, &key, rev, None)),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::duplicate_key(&self.name, &key)),
            Err(e) => Err(StoreError::Unclassified(e.into())),
        }
    }

    async fn document(&self, key: &str) -> StoreResult<StoredDocument> {
        let document = self
            .inner
            .find_one(doc! { "_id": key }, None)
            .await
            .map_err(|e| StoreError::Unclassified(e.into()))?
            .ok_or_else(|| StoreError::not_found(&self.name, key))?;

        self.from_bson(document)
    }

    async fn replace(
        &self,
        key: &str,
        body: Map<String, Value>,
        expected_rev: Option<&str>,
    ) -> StoreResult<DocumentMeta> {
        let rev = new_revision();
        let replacement = self.to_bson(key, &rev, body)?;

        let previous = self
            .inner
            .find_one_and_replace(Self::filter(key, expected_rev), replacement, None)
            .await
            .map_err(|e| StoreError::Unclassified(e.into()))?;

        match previous {
            Some(previous) => Ok(DocumentMeta::new(
                &self.name,
                key,
                rev,
                Self::previous_rev(&previous),
            )),
            None => Err(self.miss(key, expected_rev).await),
        }
    }

    async fn update(
        &self,
        key: &str,
        patch: Map<String, Value>,
        expected_rev: Option<&str>,
    ) -> StoreResult<DocumentMeta> {
        let rev = new_revision();
        let mut set = self.to_bson(key, &rev, patch)?;
        set.remove(MONGO_ID_FIELD);

        let previous = self
            .inner
            .find_one_and_update(
                Self::filter(key, expected_rev),
                doc! { "$set": set },
                None,
            )
            .await
            .map_err(|e| StoreError::Unclassified(e.into()))?;

        match previous {
            Some(previous) => Ok(DocumentMeta::new(
                &self.name,
                key,
                rev,
                Self::previous_rev(&previous),
            )),
            None => Err(self.miss(key, expected_rev).await),
        }
    }

    async fn remove(&self, key: &str, expected_rev: Option<&str>) -> StoreResult<DocumentMeta> {
        let removed = self
            .inner
            .find_one_and_delete(Self::filter(key, expected_rev), None)
            .await
            .map_err(|e| StoreError::Unclassified(e.into()))?;

        match removed {
            Some(removed) => {
                let rev = Self::previous_rev(&removed).unwrap_or_default();
                Ok(DocumentMeta::new(&self.name, key, rev, None))
            }
            None => Err(self.miss(key, expected_rev).await),
        }
    }
}
