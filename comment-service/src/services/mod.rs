pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use self::database::MongoDb;
pub use self::memory::InMemoryStore;
pub use self::metrics::{get_metrics, init_metrics, record_store_operation};
pub use self::store::{
    DocumentCollection, DocumentMeta, DocumentStore, StoreError, StoreResult, StoredDocument,
};
