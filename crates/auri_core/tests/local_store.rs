use async_trait::async_trait;
use auri_core::{
    ActivityCategory, ActivityLog, CustomRoleplay, KvBackend, LocalStore, MemoryKv, MemoryNote,
    MemorySource, Mirror, RecordPayload, RemoteError, RemoteResult, RemoteSink, Session,
    SkipReason, SqliteKv, StaticSessionProvider, StoreError, StoreEvent, StoreObserver,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

fn activity(category: ActivityCategory, note: &str) -> ActivityLog {
    ActivityLog {
        category,
        note: Some(note.to_string()),
    }
}

fn note(content: &str) -> MemoryNote {
    MemoryNote {
        content: content.to_string(),
        source: MemorySource::User,
    }
}

fn roleplay(title: &str) -> CustomRoleplay {
    CustomRoleplay {
        title: title.to_string(),
        scenario: "asking for a raise".to_string(),
        partner_role: "manager".to_string(),
        goal: None,
    }
}

struct ChannelObserver(UnboundedSender<StoreEvent>);

impl StoreObserver for ChannelObserver {
    fn observe(&self, event: &StoreEvent) {
        let _ = self.0.send(event.clone());
    }
}

fn channel_observer() -> (Arc<ChannelObserver>, UnboundedReceiver<StoreEvent>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(ChannelObserver(tx)), rx)
}

async fn next_event(rx: &mut UnboundedReceiver<StoreEvent>) -> StoreEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for store event")
        .expect("observer channel closed")
}

#[derive(Default)]
struct FailingSink {
    calls: AtomicUsize,
}

#[async_trait]
impl RemoteSink for FailingSink {
    async fn upsert(
        &self,
        _table: &str,
        _row: &Map<String, Value>,
        _session: &Session,
    ) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RemoteError::Transport("connection reset by peer".to_string()))
    }
}

#[test]
fn append_then_list_contains_payload_with_unique_id() {
    let store = LocalStore::<ActivityLog>::new(Arc::new(MemoryKv::new()));

    let mut ids = HashSet::new();
    for index in 0..20 {
        let payload = activity(ActivityCategory::Journal, &format!("entry {index}"));
        let record = store.append(payload.clone()).unwrap();
        assert!(ids.insert(record.id), "duplicate id {}", record.id);

        let listed = store.list();
        let found = listed.iter().find(|r| r.id == record.id).unwrap();
        assert_eq!(found.payload, payload);
    }
    assert_eq!(store.len(), 20);
}

#[test]
fn fresh_store_lists_empty() {
    let store = LocalStore::<MemoryNote>::new(Arc::new(MemoryKv::new()));
    assert!(store.list().is_empty());
    assert!(store.is_empty());
}

#[test]
fn unparseable_storage_lists_empty_and_reports_corruption() {
    let backend = Arc::new(MemoryKv::new());
    let key = ActivityLog::store_options().storage_key;
    backend.set(&key, "{not json").unwrap();

    let (observer, mut rx) = channel_observer();
    let store = LocalStore::<ActivityLog>::new(backend.clone()).with_observer(observer);

    assert!(store.list().is_empty());
    match rx.try_recv().unwrap() {
        StoreEvent::ReadCorrupt { key: event_key, .. } => assert_eq!(event_key, key),
        other => panic!("unexpected event: {other:?}"),
    }

    // The next append replaces the corrupt value with a valid list.
    store
        .append(activity(ActivityCategory::Mood, "ok"))
        .unwrap();
    assert_eq!(store.list().len(), 1);
    let raw = backend.get(&key).unwrap().unwrap();
    assert!(serde_json::from_str::<Value>(&raw).unwrap().is_array());
}

#[test]
fn capped_store_keeps_most_recent_records() {
    let options = MemoryNote::store_options().with_capacity(3);
    let store = LocalStore::<MemoryNote>::with_options(Arc::new(MemoryKv::new()), options);

    for content in ["one", "two", "three", "four"] {
        store.append(note(content)).unwrap();
    }

    let contents: Vec<_> = store
        .list()
        .into_iter()
        .map(|record| record.payload.content)
        .collect();
    assert_eq!(contents, ["two", "three", "four"]);
}

#[test]
fn default_memory_store_caps_at_fifty() {
    let store = LocalStore::<MemoryNote>::new(Arc::new(MemoryKv::new()));
    for index in 0..51 {
        store.append(note(&format!("note {index}"))).unwrap();
    }

    let listed = store.list();
    assert_eq!(listed.len(), 50);
    assert_eq!(listed[0].payload.content, "note 1");
    assert_eq!(listed[49].payload.content, "note 50");
}

#[test]
fn remove_drops_only_the_matching_record() {
    let store = LocalStore::<CustomRoleplay>::new(Arc::new(MemoryKv::new()));
    let a = store.append(roleplay("A")).unwrap();
    let b = store.append(roleplay("B")).unwrap();
    let c = store.append(roleplay("C")).unwrap();

    assert!(store.remove(b.id).unwrap());
    let ids: Vec<_> = store.list().into_iter().map(|record| record.id).collect();
    assert_eq!(ids, [c.id, a.id]);

    let before = store.list();
    assert!(!store.remove(uuid::Uuid::new_v4()).unwrap());
    assert_eq!(store.list(), before);
}

#[test]
fn newest_first_store_lists_reverse_insertion_order() {
    let store = LocalStore::<ActivityLog>::new(Arc::new(MemoryKv::new()));
    let a = store.append(activity(ActivityCategory::Mood, "A")).unwrap();
    let b = store.append(activity(ActivityCategory::Mood, "B")).unwrap();
    let c = store.append(activity(ActivityCategory::Mood, "C")).unwrap();

    let listed = store.list();
    let notes: Vec<_> = listed
        .iter()
        .map(|record| record.payload.note.as_deref().unwrap())
        .collect();
    assert_eq!(notes, ["C", "B", "A"]);

    let ids: HashSet<_> = listed.iter().map(|record| record.id).collect();
    assert_eq!(ids.len(), 3);
    assert!(a.timestamp < b.timestamp);
    assert!(b.timestamp < c.timestamp);
}

#[test]
fn quota_exhaustion_surfaces_storage_full_and_keeps_existing_data() {
    let store = LocalStore::<MemoryNote>::new(Arc::new(MemoryKv::with_quota(400)));
    store.append(note("short")).unwrap();

    let err = store.append(note(&"x".repeat(1_000))).unwrap_err();
    assert!(matches!(err, StoreError::StorageFull { .. }), "{err}");

    let listed = store.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].payload.content, "short");
}

#[test]
fn records_survive_reopening_sqlite_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auri.sqlite3");

    let store = LocalStore::<CustomRoleplay>::new(Arc::new(SqliteKv::open(&path).unwrap()));
    let created = store.append(roleplay("Interview")).unwrap();
    drop(store);

    let reopened = LocalStore::<CustomRoleplay>::new(Arc::new(SqliteKv::open(&path).unwrap()));
    assert_eq!(reopened.get(created.id), Some(created));
}

#[tokio::test]
async fn mirror_failure_does_not_change_append_result_or_local_content() {
    let sink = Arc::new(FailingSink::default());
    let sessions = Arc::new(StaticSessionProvider::signed_in(Session::new(
        "user-1", "token",
    )));
    let (observer, mut rx) = channel_observer();
    let mirror = Mirror::new(tokio::runtime::Handle::current(), sessions, sink.clone())
        .with_observer(observer.clone());
    let store = LocalStore::<ActivityLog>::new(Arc::new(MemoryKv::new()))
        .with_observer(observer)
        .with_mirror(&mirror);

    let payload = activity(ActivityCategory::Breathing, "box breathing");
    let record = store.append(payload.clone()).unwrap();
    // The send has not run yet: `append` returned without awaiting it.
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    assert_eq!(record.payload, payload);

    match next_event(&mut rx).await {
        StoreEvent::MirrorFailed {
            table, record_id, ..
        } => {
            assert_eq!(table, "activity_logs");
            assert_eq!(record_id, record.id);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.list(), vec![record]);
}

#[tokio::test]
async fn missing_session_skips_mirroring_silently() {
    let sink = Arc::new(FailingSink::default());
    let (observer, mut rx) = channel_observer();
    let mirror = Mirror::new(
        tokio::runtime::Handle::current(),
        Arc::new(StaticSessionProvider::new()),
        sink.clone(),
    )
    .with_observer(observer);
    let store = LocalStore::<CustomRoleplay>::new(Arc::new(MemoryKv::new())).with_mirror(&mirror);

    let record = store.append(roleplay("Offline")).unwrap();

    match next_event(&mut rx).await {
        StoreEvent::MirrorSkipped {
            record_id, reason, ..
        } => {
            assert_eq!(record_id, record.id);
            assert_eq!(reason, SkipReason::NoSession);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.len(), 1);
}
