//! Local-first record stores.
//!
//! # Responsibility
//! - Persist ordered record lists through a `KvBackend`.
//! - Forward new records to the mirror without waiting on it.
//! - Surface swallowed failures as `StoreEvent`s.
//!
//! # Invariants
//! - A stored list is valid JSON or absent; anything else reads as empty.
//! - Local write failures are returned to the caller, remote ones never are.

pub mod events;
pub mod local_store;
