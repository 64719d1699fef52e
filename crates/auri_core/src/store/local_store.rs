//! Generic local-first append store.
//!
//! # Responsibility
//! - Append, list and remove records of one payload type under one key.
//! - Enforce the capacity cap with FIFO eviction.
//! - Hand new records to the mirror after the local write commits.
//!
//! # Invariants
//! - Record ids are unique within the stored list.
//! - Timestamps strictly increase in insertion order.
//! - `list` never fails; corrupt or unreadable data reads as empty.
//! - A failed local write leaves stored content unchanged and is returned
//!   to the caller; no mirror attempt follows it.

use crate::kv::{KvBackend, KvError};
use crate::model::record::{remote_row, InsertOrder, Record, RecordId, RecordPayload, StoreOptions};
use crate::store::events::{LogObserver, StoreEvent, StoreObserver};
use crate::sync::mirror::{DrainOutcome, Mirror, StoreMirror};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Local store failure surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend is out of space; nothing was written.
    StorageFull { key: String },
    /// Any other backend failure.
    Kv(KvError),
    /// The record list could not be encoded.
    Encode(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageFull { key } => write!(f, "local storage is full (key `{key}`)"),
            Self::Kv(err) => write!(f, "{err}"),
            Self::Encode(message) => write!(f, "failed to encode records: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<KvError> for StoreError {
    fn from(value: KvError) -> Self {
        match value {
            KvError::QuotaExceeded { key, .. } => Self::StorageFull { key },
            other => Self::Kv(other),
        }
    }
}

/// Ordered, optionally capped list of records persisted under one key.
pub struct LocalStore<T: RecordPayload> {
    backend: Arc<dyn KvBackend>,
    options: StoreOptions,
    observer: Arc<dyn StoreObserver>,
    mirror: Option<StoreMirror>,
    write_lock: Mutex<()>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: RecordPayload> LocalStore<T> {
    /// Creates a store with the payload's default layout.
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_options(backend, T::store_options())
    }

    pub fn with_options(backend: Arc<dyn KvBackend>, options: StoreOptions) -> Self {
        Self {
            backend,
            options,
            observer: Arc::new(LogObserver),
            mirror: None,
            write_lock: Mutex::new(()),
            _payload: PhantomData,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Enables remote mirroring when the payload declares a remote table.
    pub fn with_mirror(mut self, mirror: &Mirror) -> Self {
        self.mirror = T::remote_table().map(|table| {
            mirror.for_store(table, &self.options.storage_key, Arc::clone(&self.backend))
        });
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Creates, persists and returns a new record.
    ///
    /// Remote replication is scheduled after the local write and never
    /// awaited.
    ///
    /// # Errors
    /// - `StoreError::StorageFull` when the backend quota is exhausted.
    /// - `StoreError::Kv` for other backend read/write failures.
    pub fn append(&self, payload: T) -> StoreResult<Record<T>> {
        let record = {
            let _guard = self.write_lock.lock().unwrap_or_else(|err| err.into_inner());
            let mut records = self.load_for_write()?;

            let record = Record::new(
                fresh_id(&records),
                next_timestamp(&records, Utc::now()),
                payload,
            );
            match self.options.order {
                InsertOrder::NewestFirst => records.insert(0, record.clone()),
                InsertOrder::OldestFirst => records.push(record.clone()),
            }
            let evicted = self.evict_overflow(&mut records);

            self.save(&records)?;
            if evicted > 0 {
                self.observer.observe(&StoreEvent::Evicted {
                    key: self.options.storage_key.clone(),
                    count: evicted,
                });
            }
            record
        };

        if let Some(mirror) = &self.mirror {
            mirror.dispatch(record.id, remote_row(&record));
        }
        Ok(record)
    }

    /// Returns every stored record in store order.
    pub fn list(&self) -> Vec<Record<T>> {
        let raw = match self.backend.get(&self.options.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                self.observer.observe(&StoreEvent::ReadFailed {
                    key: self.options.storage_key.clone(),
                    error: err.to_string(),
                });
                return Vec::new();
            }
        };
        self.decode(&raw)
    }

    pub fn get(&self, id: RecordId) -> Option<Record<T>> {
        self.list().into_iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the record with `id`.
    ///
    /// Returns `Ok(false)` without touching storage when no record matches.
    pub fn remove(&self, id: RecordId) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(|err| err.into_inner());
        let mut records = self.load_for_write()?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }

    /// Drops every record. Pending outbox entries are kept.
    pub fn clear(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|err| err.into_inner());
        self.backend.remove(&self.options.storage_key)?;
        Ok(())
    }

    /// Runs one outbox drain pass; `None` unless the outbox policy is active.
    pub async fn drain_outbox(&self) -> Option<DrainOutcome> {
        self.mirror.as_ref()?.drain_now().await
    }

    /// Starts a periodic outbox drain; `None` unless the outbox policy is
    /// active.
    pub fn spawn_outbox_loop(&self, period: Duration) -> Option<JoinHandle<()>> {
        self.mirror
            .as_ref()
            .filter(|mirror| mirror.has_outbox())?
            .spawn_drain_loop(period)
    }

    /// Reads the list for a read-modify-write cycle.
    ///
    /// Corrupt data is replaced on the next save; backend read failures
    /// abort the write so unreadable data is never overwritten.
    fn load_for_write(&self) -> StoreResult<Vec<Record<T>>> {
        match self.backend.get(&self.options.storage_key)? {
            Some(raw) => Ok(self.decode(&raw)),
            None => Ok(Vec::new()),
        }
    }

    fn decode(&self, raw: &str) -> Vec<Record<T>> {
        match serde_json::from_str(raw) {
            Ok(records) => records,
            Err(err) => {
                self.observer.observe(&StoreEvent::ReadCorrupt {
                    key: self.options.storage_key.clone(),
                    error: err.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[Record<T>]) -> StoreResult<()> {
        let raw =
            serde_json::to_string(records).map_err(|err| StoreError::Encode(err.to_string()))?;
        self.backend.set(&self.options.storage_key, &raw)?;
        Ok(())
    }

    fn evict_overflow(&self, records: &mut Vec<Record<T>>) -> usize {
        let Some(capacity) = self.options.capacity else {
            return 0;
        };
        let overflow = records.len().saturating_sub(capacity);
        if overflow == 0 {
            return 0;
        }
        match self.options.order {
            InsertOrder::NewestFirst => records.truncate(capacity),
            InsertOrder::OldestFirst => {
                records.drain(..overflow);
            }
        }
        overflow
    }
}

fn fresh_id<T>(records: &[Record<T>]) -> RecordId {
    loop {
        let id = Uuid::new_v4();
        if records.iter().all(|record| record.id != id) {
            return id;
        }
    }
}

fn next_timestamp<T>(records: &[Record<T>], now: DateTime<Utc>) -> DateTime<Utc> {
    match records.iter().map(|record| record.timestamp).max() {
        Some(latest) if now <= latest => latest + ChronoDuration::milliseconds(1),
        _ => now,
    }
}
