//! Durable pending-sync queue for the outbox mirror policy.
//!
//! # Responsibility
//! - Persist rows waiting for remote confirmation next to the store data.
//! - Guarantee at most one drain per outbox at a time.
//!
//! # Invariants
//! - Entries are unique by `record_id`; re-enqueueing is a no-op.
//! - Entries leave the queue only through `acknowledge`, i.e. after a
//!   confirmed remote write.

use crate::kv::{KvBackend, KvError, KvResult};
use crate::model::record::RecordId;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One row waiting to be mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub record_id: RecordId,
    pub table: String,
    /// Remote row without session-owned fields.
    pub row: Map<String, Value>,
}

pub struct Outbox {
    backend: Arc<dyn KvBackend>,
    key: String,
    queue_lock: Mutex<()>,
    draining: AtomicBool,
}

/// Held while a drain runs; releases the single-flight flag on drop.
pub(crate) struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Outbox {
    pub fn new(backend: Arc<dyn KvBackend>, storage_key: &str) -> Self {
        Self {
            backend,
            key: outbox_key(storage_key),
            queue_lock: Mutex::new(()),
            draining: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn enqueue(&self, entry: OutboxEntry) -> KvResult<()> {
        let _guard = self.queue_lock.lock().unwrap_or_else(|err| err.into_inner());
        let mut entries = self.load()?;
        if entries.iter().any(|item| item.record_id == entry.record_id) {
            return Ok(());
        }
        entries.push(entry);
        self.save(&entries)
    }

    /// Returns a snapshot of pending entries in enqueue order.
    pub fn pending(&self) -> KvResult<Vec<OutboxEntry>> {
        let _guard = self.queue_lock.lock().unwrap_or_else(|err| err.into_inner());
        self.load()
    }

    /// Removes confirmed entries and returns how many remain.
    pub fn acknowledge(&self, confirmed: &HashSet<RecordId>) -> KvResult<usize> {
        let _guard = self.queue_lock.lock().unwrap_or_else(|err| err.into_inner());
        let mut entries = self.load()?;
        if confirmed.is_empty() {
            return Ok(entries.len());
        }
        entries.retain(|entry| !confirmed.contains(&entry.record_id));
        self.save(&entries)?;
        Ok(entries.len())
    }

    pub(crate) fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard {
                flag: &self.draining,
            })
    }

    fn load(&self) -> KvResult<Vec<OutboxEntry>> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(
                    "event=outbox_load module=sync status=corrupt key={} error={}",
                    self.key, err
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, entries: &[OutboxEntry]) -> KvResult<()> {
        if entries.is_empty() {
            return self.backend.remove(&self.key);
        }
        let raw = serde_json::to_string(entries)
            .map_err(|err| KvError::Backend(format!("outbox encode failed: {err}")))?;
        self.backend.set(&self.key, &raw)
    }
}

pub(crate) fn outbox_key(storage_key: &str) -> String {
    format!("{storage_key}.outbox")
}
