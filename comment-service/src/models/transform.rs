//! Conversions between the stored record shape and the client-facing shape.
//!
//! Stored records carry the store's metadata (`_key`, `_id`, `_rev`,
//! `_oldRev`). Clients only ever see the key, renamed to `id`.

use serde_json::{Map, Value};

pub const KEY_FIELD: &str = "_key";
pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";
pub const OLD_REV_FIELD: &str = "_oldRev";

/// Public identifier field exposed to clients.
pub const CLIENT_ID_FIELD: &str = "id";

pub const STORE_FIELDS: [&str; 4] = [REV_FIELD, OLD_REV_FIELD, ID_FIELD, KEY_FIELD];

/// Internal record → API representation.
///
/// The key is copied to `id` before the metadata is dropped, so a record
/// without `_key` comes out without `id`.
pub fn for_client(mut record: Map<String, Value>) -> Map<String, Value> {
    match record.get(KEY_FIELD).cloned() {
        Some(key) => {
            record.insert(CLIENT_ID_FIELD.to_string(), key);
        }
        None => {
            record.remove(CLIENT_ID_FIELD);
        }
    }
    strip_store_fields(&mut record);
    record
}

/// API representation → internal record. Clients never choose the id.
pub fn from_client(mut payload: Map<String, Value>) -> Map<String, Value> {
    payload.remove(CLIENT_ID_FIELD);
    payload
}

pub fn strip_store_fields(record: &mut Map<String, Value>) {
    for field in STORE_FIELDS {
        record.remove(field);
    }
}
