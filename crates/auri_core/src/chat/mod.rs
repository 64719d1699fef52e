//! Client-side chat helpers around the Auri conversation.
//!
//! # Responsibility
//! - Avoid near-duplicate assistant replies.
//! - Meter free-tier usage.
//! - Hold quick-reply suggestions as explicitly owned state.

pub mod quick_replies;
pub mod reply_guard;
pub mod usage_meter;
