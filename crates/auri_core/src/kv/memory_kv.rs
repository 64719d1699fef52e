//! In-process key-value storage with an optional byte quota.

use super::{KvBackend, KvError, KvResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Volatile key-value backend.
///
/// The optional quota bounds the total size of keys plus values, mimicking
/// the per-origin limits of browser storage.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that rejects writes once `quota_bytes` is exceeded.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the bytes currently held (keys plus values).
    pub fn used_bytes(&self) -> usize {
        self.lock()
            .map(|entries| total_bytes(&entries))
            .unwrap_or_default()
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| KvError::Backend("memory kv lock poisoned".to_string()))
    }
}

impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let replaced = entries
                .get(key)
                .map_or(0, |previous| key.len() + previous.len());
            let projected = total_bytes(&entries) - replaced + key.len() + value.len();
            if projected > quota {
                return Err(KvError::QuotaExceeded {
                    key: key.to_string(),
                    needed_bytes: value.len(),
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

fn total_bytes(entries: &HashMap<String, String>) -> usize {
    entries
        .iter()
        .map(|(key, value)| key.len() + value.len())
        .sum()
}
