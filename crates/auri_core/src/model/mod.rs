//! Record model and feature payloads.
//!
//! # Responsibility
//! - Define the generic `Record<T>` envelope every store persists.
//! - Define the payloads for activity logs, memory notes and roleplays.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Payloads describe their own storage key, order, capacity and remote
//!   mapping through `RecordPayload`.

pub mod activity_log;
pub mod memory_note;
pub mod record;
pub mod roleplay;
