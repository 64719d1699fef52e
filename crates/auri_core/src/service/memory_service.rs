//! Memory note use-cases.
//!
//! ```compile_fail
//! use auri_core::service::memory_service::MemoryService;
//!
//! fn forget(service: &MemoryService) {
//!     service.store().clear().unwrap();
//! }
//! ```
//!
//! # Invariants
//! - The store keeps at most its configured capacity; the oldest notes go
//!   first.
//! - Blank notes are rejected.

use super::{require_text, ServiceResult};
use crate::model::memory_note::{MemoryNote, MemorySource};
use crate::model::record::Record;
use crate::store::local_store::LocalStore;

pub struct MemoryService {
    store: LocalStore<MemoryNote>,
}

impl MemoryService {
    pub fn new(store: LocalStore<MemoryNote>) -> Self {
        Self { store }
    }

    pub fn remember(
        &self,
        content: &str,
        source: MemorySource,
    ) -> ServiceResult<Record<MemoryNote>> {
        let content = require_text("memory content", content)?;
        Ok(self.store.append(MemoryNote { content, source })?)
    }

    /// Returns notes oldest-first.
    pub fn list(&self) -> Vec<Record<MemoryNote>> {
        self.store.list()
    }

    /// Renders the `max` most recent notes as a bullet list for chat
    /// context, oldest of them first. Empty when there are no notes.
    pub fn context_block(&self, max: usize) -> String {
        let notes = self.store.list();
        let skip = notes.len().saturating_sub(max);
        notes
            .iter()
            .skip(skip)
            .map(|record| format!("- {}", record.payload.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn store(&self) -> &LocalStore<MemoryNote> {
        &self.store
    }
}
