//! Core domain logic for Auri.
//! This crate is the single source of truth for local persistence and
//! remote mirroring invariants.

pub mod app;
pub mod assessment;
pub mod chat;
pub mod config;
pub mod db;
pub mod kv;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

pub use app::{AuriCore, CoreError};
pub use config::{ConfigError, CoreConfig, RemoteConfig};
pub use kv::{KvBackend, KvError, KvResult, MemoryKv, SqliteKv};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::activity_log::{ActivityCategory, ActivityLog};
pub use model::memory_note::{MemoryNote, MemorySource};
pub use model::record::{InsertOrder, Record, RecordId, RecordPayload, StoreOptions};
pub use model::roleplay::CustomRoleplay;
pub use store::events::{LogObserver, SkipReason, StoreEvent, StoreObserver};
pub use store::local_store::{LocalStore, StoreError, StoreResult};
pub use sync::mirror::{DrainOutcome, Mirror, MirrorPolicy};
pub use sync::remote::{RemoteError, RemoteResult, RemoteSink};
pub use sync::session::{Session, SessionProvider, StaticSessionProvider};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
