//! Operator-facing events for failures that callers never see.
//!
//! # Responsibility
//! - Give swallowed local and remote failures an explicit shape.
//! - Route them to an observability collaborator instead of dropping them.
//!
//! # Invariants
//! - Observers must not panic and must not block.
//! - Payload content never appears in events; only keys, tables and ids.

use crate::model::record::RecordId;
use log::{debug, info, warn};

/// Why a mirror attempt did not reach the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No authenticated session was available.
    NoSession,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
        }
    }
}

/// Recovered or background condition worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Stored list exists but failed to parse; read as empty.
    ReadCorrupt { key: String, error: String },
    /// Backend read failed; read as empty.
    ReadFailed { key: String, error: String },
    /// Capped store dropped its oldest records.
    Evicted { key: String, count: usize },
    MirrorSkipped {
        table: String,
        record_id: RecordId,
        reason: SkipReason,
    },
    MirrorSucceeded { table: String, record_id: RecordId },
    MirrorFailed {
        table: String,
        record_id: RecordId,
        error: String,
    },
    /// Outbox write failed after the local write succeeded.
    OutboxEnqueueFailed {
        key: String,
        record_id: RecordId,
        error: String,
    },
    /// Confirmed entries could not be removed; they will be re-sent.
    OutboxAckFailed {
        key: String,
        confirmed: usize,
        error: String,
    },
    OutboxDrained {
        key: String,
        sent: usize,
        remaining: usize,
    },
}

/// Receives store events.
pub trait StoreObserver: Send + Sync {
    fn observe(&self, event: &StoreEvent);
}

/// Default observer writing structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StoreObserver for LogObserver {
    fn observe(&self, event: &StoreEvent) {
        match event {
            StoreEvent::ReadCorrupt { key, error } => warn!(
                "event=store_read module=store status=corrupt key={key} error={error}"
            ),
            StoreEvent::ReadFailed { key, error } => warn!(
                "event=store_read module=store status=error key={key} error={error}"
            ),
            StoreEvent::Evicted { key, count } => {
                debug!("event=store_evict module=store status=ok key={key} count={count}")
            }
            StoreEvent::MirrorSkipped {
                table,
                record_id,
                reason,
            } => debug!(
                "event=mirror_send module=sync status=skipped table={table} record_id={record_id} reason={}",
                reason.as_str()
            ),
            StoreEvent::MirrorSucceeded { table, record_id } => debug!(
                "event=mirror_send module=sync status=ok table={table} record_id={record_id}"
            ),
            StoreEvent::MirrorFailed {
                table,
                record_id,
                error,
            } => warn!(
                "event=mirror_send module=sync status=error table={table} record_id={record_id} error={error}"
            ),
            StoreEvent::OutboxEnqueueFailed {
                key,
                record_id,
                error,
            } => warn!(
                "event=outbox_enqueue module=sync status=error key={key} record_id={record_id} error={error}"
            ),
            StoreEvent::OutboxAckFailed {
                key,
                confirmed,
                error,
            } => warn!(
                "event=outbox_ack module=sync status=error key={key} confirmed={confirmed} error={error}"
            ),
            StoreEvent::OutboxDrained {
                key,
                sent,
                remaining,
            } => info!(
                "event=outbox_drain module=sync status=ok key={key} sent={sent} remaining={remaining}"
            ),
        }
    }
}
