//! On-device key-value persistence.
//!
//! # Responsibility
//! - Define the string key-value contract that local stores persist through.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - Values are opaque UTF-8 text; encoding is owned by the caller.
//! - Quota exhaustion is reported as `KvError::QuotaExceeded`, distinct from
//!   other backend failures.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory_kv;
mod sqlite_kv;

pub use memory_kv::MemoryKv;
pub use sqlite_kv::SqliteKv;

pub type KvResult<T> = Result<T, KvError>;

/// Key-value backend error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    /// Storage has no room for the value being written.
    QuotaExceeded { key: String, needed_bytes: usize },
    /// Any other backend failure (I/O, locking, driver errors).
    Backend(String),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { key, needed_bytes } => write!(
                f,
                "storage quota exceeded writing `{key}` ({needed_bytes} bytes)"
            ),
            Self::Backend(message) => write!(f, "storage backend error: {message}"),
        }
    }
}

impl Error for KvError {}

/// String key-value storage used by local stores.
///
/// Implementations must be safe to share across threads: mirror drains read
/// and write outbox keys from background tasks.
pub trait KvBackend: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    /// Inserts or replaces the value for `key`.
    fn set(&self, key: &str, value: &str) -> KvResult<()>;
    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> KvResult<()>;
}
