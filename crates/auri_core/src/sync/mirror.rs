//! Best-effort replication of local writes to the remote service.
//!
//! # Responsibility
//! - Hand each appended record to a background task without blocking the
//!   caller.
//! - Apply the configured policy: one-shot send, or durable outbox drain.
//! - Report every outcome to the store observer.
//!
//! # Invariants
//! - Mirror failures never reach the caller of `append`.
//! - One-shot mode never retries and never queues.
//! - Outbox entries are removed only after a confirmed remote write.

use super::outbox::{Outbox, OutboxEntry};
use super::remote::RemoteSink;
use super::session::{Session, SessionProvider};
use crate::kv::KvBackend;
use crate::model::record::RecordId;
use crate::store::events::{LogObserver, SkipReason, StoreEvent, StoreObserver};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// How appended records reach the remote service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorPolicy {
    /// Single attempt per record; offline writes are never replicated.
    #[default]
    OneShot,
    /// Durable queue drained whenever a session is available.
    Outbox,
}

/// Result of one outbox drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain for the same outbox was in flight.
    AlreadyRunning,
    NoSession,
    /// The queue could not be read; its size is unknown.
    Unreadable,
    Completed { sent: usize, remaining: usize },
}

/// Shared mirroring context: runtime, session source, sink and observer.
#[derive(Clone)]
pub struct Mirror {
    runtime: Handle,
    sessions: Arc<dyn SessionProvider>,
    sink: Arc<dyn RemoteSink>,
    observer: Arc<dyn StoreObserver>,
    policy: MirrorPolicy,
}

impl Mirror {
    pub fn new(
        runtime: Handle,
        sessions: Arc<dyn SessionProvider>,
        sink: Arc<dyn RemoteSink>,
    ) -> Self {
        Self {
            runtime,
            sessions,
            sink,
            observer: Arc::new(LogObserver),
            policy: MirrorPolicy::OneShot,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_policy(mut self, policy: MirrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MirrorPolicy {
        self.policy
    }

    /// Binds this context to one store's remote table.
    pub(crate) fn for_store(
        &self,
        table: &'static str,
        storage_key: &str,
        backend: Arc<dyn KvBackend>,
    ) -> StoreMirror {
        let outbox = match self.policy {
            MirrorPolicy::OneShot => None,
            MirrorPolicy::Outbox => Some(Arc::new(Outbox::new(backend, storage_key))),
        };
        StoreMirror {
            mirror: self.clone(),
            table,
            outbox,
        }
    }

    async fn send(&self, table: &str, record_id: RecordId, row: Map<String, Value>) -> bool {
        let Some(session) = self.sessions.current_session().await else {
            self.observer.observe(&StoreEvent::MirrorSkipped {
                table: table.to_string(),
                record_id,
                reason: SkipReason::NoSession,
            });
            return false;
        };
        self.send_with_session(table, record_id, row, &session).await
    }

    async fn send_with_session(
        &self,
        table: &str,
        record_id: RecordId,
        row: Map<String, Value>,
        session: &Session,
    ) -> bool {
        let row = with_user(row, session);
        match self.sink.upsert(table, &row, session).await {
            Ok(()) => {
                self.observer.observe(&StoreEvent::MirrorSucceeded {
                    table: table.to_string(),
                    record_id,
                });
                true
            }
            Err(err) => {
                self.observer.observe(&StoreEvent::MirrorFailed {
                    table: table.to_string(),
                    record_id,
                    error: err.to_string(),
                });
                false
            }
        }
    }
}

/// Mirror bound to a single store.
#[derive(Clone)]
pub(crate) struct StoreMirror {
    mirror: Mirror,
    table: &'static str,
    outbox: Option<Arc<Outbox>>,
}

impl StoreMirror {
    /// Schedules replication of one freshly written record.
    pub(crate) fn dispatch(&self, record_id: RecordId, row: Map<String, Value>) {
        let Some(outbox) = &self.outbox else {
            let mirror = self.mirror.clone();
            let table = self.table;
            self.mirror.runtime.spawn(async move {
                mirror.send(table, record_id, row).await;
            });
            return;
        };

        let entry = OutboxEntry {
            record_id,
            table: self.table.to_string(),
            row,
        };
        if let Err(err) = outbox.enqueue(entry) {
            self.mirror.observer.observe(&StoreEvent::OutboxEnqueueFailed {
                key: outbox.key().to_string(),
                record_id,
                error: err.to_string(),
            });
            return;
        }
        self.spawn_drain();
    }

    pub(crate) fn has_outbox(&self) -> bool {
        self.outbox.is_some()
    }

    pub(crate) fn spawn_drain(&self) -> Option<JoinHandle<DrainOutcome>> {
        let outbox = self.outbox.clone()?;
        let mirror = self.mirror.clone();
        Some(
            self.mirror
                .runtime
                .spawn(async move { drain(&mirror, &outbox).await }),
        )
    }

    pub(crate) async fn drain_now(&self) -> Option<DrainOutcome> {
        let outbox = self.outbox.as_ref()?;
        Some(drain(&self.mirror, outbox).await)
    }

    /// Drains the outbox every `period` until the task is aborted.
    pub(crate) fn spawn_drain_loop(&self, period: Duration) -> Option<JoinHandle<()>> {
        let outbox = self.outbox.clone()?;
        let mirror = self.mirror.clone();
        Some(self.mirror.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                drain(&mirror, &outbox).await;
            }
        }))
    }
}

async fn drain(mirror: &Mirror, outbox: &Outbox) -> DrainOutcome {
    let Some(_guard) = outbox.try_begin_drain() else {
        return DrainOutcome::AlreadyRunning;
    };

    let pending = match outbox.pending() {
        Ok(pending) => pending,
        Err(err) => {
            mirror.observer.observe(&StoreEvent::ReadFailed {
                key: outbox.key().to_string(),
                error: err.to_string(),
            });
            return DrainOutcome::Unreadable;
        }
    };
    if pending.is_empty() {
        return DrainOutcome::Completed {
            sent: 0,
            remaining: 0,
        };
    }

    let Some(session) = mirror.sessions.current_session().await else {
        return DrainOutcome::NoSession;
    };

    let queued = pending.len();
    let mut confirmed = HashSet::new();
    for entry in pending {
        let sent = mirror
            .send_with_session(&entry.table, entry.record_id, entry.row, &session)
            .await;
        if !sent {
            // Stop at the first failure; the rest stay queued.
            break;
        }
        confirmed.insert(entry.record_id);
    }

    let remaining = match outbox.acknowledge(&confirmed) {
        Ok(remaining) => remaining,
        Err(err) => {
            mirror.observer.observe(&StoreEvent::OutboxAckFailed {
                key: outbox.key().to_string(),
                confirmed: confirmed.len(),
                error: err.to_string(),
            });
            // Nothing was removed, so every entry is still queued.
            return DrainOutcome::Completed {
                sent: confirmed.len(),
                remaining: queued,
            };
        }
    };
    mirror.observer.observe(&StoreEvent::OutboxDrained {
        key: outbox.key().to_string(),
        sent: confirmed.len(),
        remaining,
    });
    DrainOutcome::Completed {
        sent: confirmed.len(),
        remaining,
    }
}

fn with_user(mut row: Map<String, Value>, session: &Session) -> Map<String, Value> {
    row.insert(
        "user_id".to_string(),
        Value::String(session.user_id.clone()),
    );
    row
}
