//! Generic record envelope shared by every local store.
//!
//! # Responsibility
//! - Wrap a feature payload with a generated identity and creation time.
//! - Describe how a payload is stored and mirrored (`RecordPayload`).
//!
//! # Invariants
//! - `id` and `timestamp` are assigned by the store, never by callers.
//! - Records are immutable after creation.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Stable identifier for a stored record.
pub type RecordId = Uuid;

/// One immutable, timestamped entry of a local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: RecordId,
    /// Creation time, serialized as RFC 3339.
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T> Record<T> {
    pub(crate) fn new(id: RecordId, timestamp: DateTime<Utc>, payload: T) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

/// Where new records land in the stored list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOrder {
    /// New records are inserted at the head; eviction drops from the tail.
    NewestFirst,
    /// New records are appended at the tail; eviction drops from the head.
    OldestFirst,
}

/// Storage layout for one store instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Fixed key under which the serialized list lives.
    pub storage_key: String,
    pub order: InsertOrder,
    /// Maximum retained records; `None` means uncapped.
    pub capacity: Option<usize>,
}

impl StoreOptions {
    pub fn new(storage_key: impl Into<String>, order: InsertOrder) -> Self {
        Self {
            storage_key: storage_key.into(),
            order,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// A feature payload that can live inside a `LocalStore`.
pub trait RecordPayload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Default storage layout for this payload.
    fn store_options() -> StoreOptions;

    /// Remote table receiving mirrored rows; `None` disables mirroring.
    fn remote_table() -> Option<&'static str> {
        None
    }

    /// Maps the payload fields that are mirrored remotely.
    ///
    /// `id` and `created_at` are added by the mirror; `user_id` is added from
    /// the active session at send time.
    fn remote_fields(&self) -> Map<String, Value>;
}

/// Builds the remote row for a record, without the session-owned fields.
pub(crate) fn remote_row<T: RecordPayload>(record: &Record<T>) -> Map<String, Value> {
    let mut row = record.payload.remote_fields();
    row.insert("id".to_string(), Value::String(record.id.to_string()));
    row.insert(
        "created_at".to_string(),
        Value::String(record.timestamp.to_rfc3339()),
    );
    row
}
