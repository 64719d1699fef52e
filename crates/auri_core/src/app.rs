//! Process-level wiring of stores, services and mirroring.
//!
//! # Responsibility
//! - Open the on-device database and build every feature store over it.
//! - Attach remote mirroring when a remote endpoint is configured.
//! - Own the session holder the UI updates on sign-in and sign-out.

use crate::chat::usage_meter::UsageMeter;
use crate::config::{ConfigError, CoreConfig};
use crate::db::DbError;
use crate::kv::{KvBackend, SqliteKv};
use crate::model::activity_log::ActivityLog;
use crate::model::memory_note::MemoryNote;
use crate::model::record::RecordPayload;
use crate::model::roleplay::CustomRoleplay;
use crate::service::activity_service::ActivityService;
use crate::service::memory_service::MemoryService;
use crate::service::roleplay_service::RoleplayService;
use crate::store::events::{LogObserver, StoreObserver};
use crate::store::local_store::LocalStore;
use crate::sync::mirror::{DrainOutcome, Mirror};
use crate::sync::remote::{RemoteError, RemoteSink};
use crate::sync::rest_remote::RestRemote;
use crate::sync::session::{Session, StaticSessionProvider};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub enum CoreError {
    Config(ConfigError),
    Db(DbError),
    Remote(RemoteError),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RemoteError> for CoreError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

/// Fully wired core: one instance per app process.
pub struct AuriCore {
    config: CoreConfig,
    sessions: Arc<StaticSessionProvider>,
    activity: ActivityService,
    memory: MemoryService,
    roleplay: RoleplayService,
    usage: UsageMeter,
}

impl AuriCore {
    /// Opens the SQLite database at `config.db_path` and wires every store.
    ///
    /// # Errors
    /// - `CoreError::Config` for an invalid config.
    /// - `CoreError::Db` when the database cannot be opened or migrated.
    /// - `CoreError::Remote` when the remote client cannot be built.
    pub fn open(config: CoreConfig, runtime: Handle) -> Result<Self, CoreError> {
        config.validate()?;
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                CoreError::Config(ConfigError::Io {
                    path: parent.to_path_buf(),
                    message: err.to_string(),
                })
            })?;
        }
        let backend: Arc<dyn KvBackend> = Arc::new(SqliteKv::open(&config.db_path)?);

        let sink = match &config.remote {
            Some(remote) => {
                let rest = RestRemote::new(
                    remote.base_url.clone(),
                    remote.api_key.clone(),
                    Duration::from_secs(remote.timeout_secs),
                )?;
                Some(Arc::new(rest) as Arc<dyn RemoteSink>)
            }
            None => None,
        };

        Self::with_backend(config, backend, runtime, sink, Arc::new(LogObserver))
    }

    /// Wires the core over an existing backend and optional remote sink.
    pub fn with_backend(
        config: CoreConfig,
        backend: Arc<dyn KvBackend>,
        runtime: Handle,
        sink: Option<Arc<dyn RemoteSink>>,
        observer: Arc<dyn StoreObserver>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let sessions = Arc::new(StaticSessionProvider::new());
        let mirror = sink.map(|sink| {
            Mirror::new(runtime, sessions.clone(), sink)
                .with_observer(Arc::clone(&observer))
                .with_policy(config.mirror_policy)
        });

        let memory_options = MemoryNote::store_options().with_capacity(config.memory_capacity);

        let activity = wire(
            LocalStore::<ActivityLog>::new(Arc::clone(&backend)),
            &observer,
            mirror.as_ref(),
        );
        let memory = wire(
            LocalStore::<MemoryNote>::with_options(Arc::clone(&backend), memory_options),
            &observer,
            mirror.as_ref(),
        );
        let roleplay = wire(
            LocalStore::<CustomRoleplay>::new(Arc::clone(&backend)),
            &observer,
            mirror.as_ref(),
        );

        info!(
            "event=core_open module=app status=ok mirror={} policy={:?} memory_capacity={}",
            mirror.is_some(),
            config.mirror_policy,
            config.memory_capacity
        );

        Ok(Self {
            usage: UsageMeter::new(backend, config.daily_message_limit),
            sessions,
            activity: ActivityService::new(activity),
            memory: MemoryService::new(memory),
            roleplay: RoleplayService::new(roleplay),
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn activity(&self) -> &ActivityService {
        &self.activity
    }

    pub fn memory(&self) -> &MemoryService {
        &self.memory
    }

    pub fn roleplay(&self) -> &RoleplayService {
        &self.roleplay
    }

    pub fn usage(&self) -> &UsageMeter {
        &self.usage
    }

    pub fn sign_in(&self, session: Session) {
        info!("event=session_change module=app status=signed_in");
        self.sessions.set_session(session);
    }

    pub fn sign_out(&self) {
        info!("event=session_change module=app status=signed_out");
        self.sessions.clear();
    }

    pub fn current_session(&self) -> Option<Session> {
        self.sessions.snapshot()
    }

    /// Runs one drain pass over every store's outbox.
    pub async fn drain_outboxes(&self) -> Vec<DrainOutcome> {
        let mut outcomes = Vec::new();
        outcomes.extend(self.activity.store().drain_outbox().await);
        outcomes.extend(self.memory.store().drain_outbox().await);
        outcomes.extend(self.roleplay.store().drain_outbox().await);
        outcomes
    }

    /// Starts periodic outbox drains using `config.outbox_drain_secs`.
    ///
    /// Empty unless mirroring runs with the outbox policy.
    pub fn spawn_outbox_loops(&self) -> Vec<JoinHandle<()>> {
        let period = Duration::from_secs(self.config.outbox_drain_secs);
        let mut handles = Vec::new();
        handles.extend(self.activity.store().spawn_outbox_loop(period));
        handles.extend(self.memory.store().spawn_outbox_loop(period));
        handles.extend(self.roleplay.store().spawn_outbox_loop(period));
        handles
    }
}

fn wire<T: RecordPayload>(
    store: LocalStore<T>,
    observer: &Arc<dyn StoreObserver>,
    mirror: Option<&Mirror>,
) -> LocalStore<T> {
    let store = store.with_observer(Arc::clone(observer));
    match mirror {
        Some(mirror) => store.with_mirror(mirror),
        None => store,
    }
}
