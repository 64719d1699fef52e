//! Remote mirroring of local writes.
//!
//! # Responsibility
//! - Model the session gate, the remote sink and the mirror policies.
//! - Keep every remote concern off the local write path.
//!
//! # Invariants
//! - Local storage stays the source of truth; the remote copy is advisory.

pub mod mirror;
pub mod outbox;
pub mod remote;
pub mod rest_remote;
pub mod session;
