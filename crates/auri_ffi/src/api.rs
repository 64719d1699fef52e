//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own the process-wide core instance and its background runtime.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Local writes report their own failures; mirror failures never do.
//! - The core is opened lazily on first use when `init_core` was not called.

use auri_core::assessment::{score, Questionnaire, Severity};
use auri_core::chat::usage_meter::{Plan, UsageSnapshot};
use auri_core::service::roleplay_service::NewRoleplay;
use auri_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ActivityCategory, ActivityLog, AuriCore, CoreConfig, CustomRoleplay, DrainOutcome,
    MemoryNote, MemorySource, MirrorPolicy, Record, Session,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

const FFI_DB_FILE_NAME: &str = "auri_ffi.sqlite3";
const ENV_DB_PATH: &str = "AURI_DB_PATH";

static RUNTIME: OnceLock<Runtime> = OnceLock::new();
static CORE: OnceLock<AuriCore> = OnceLock::new();
static CORE_INIT: Mutex<()> = Mutex::new(());

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Opens the core over `db_path`.
///
/// `config_json` is an optional JSON config document; `AURI_*` environment
/// variables override it.
///
/// # FFI contract
/// - Idempotent for the same `db_path`; a different path after init fails.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_core(db_path: String, config_json: Option<String>) -> String {
    let config = match build_config(Some(db_path), config_json.as_deref()) {
        Ok(config) => config,
        Err(err) => return err,
    };

    if let Some(core) = CORE.get() {
        if core.config().db_path == config.db_path {
            return String::new();
        }
        return format!(
            "core already initialized at `{}`",
            core.config().db_path.display()
        );
    }

    let db_path = config.db_path.clone();
    match install_core(config) {
        Ok(core) if core.config().db_path == db_path => String::new(),
        Ok(core) => format!(
            "core already initialized at `{}`",
            core.config().db_path.display()
        ),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Created or affected record id.
    pub record_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, record_id: String) -> Self {
        Self {
            ok: true,
            record_id: Some(record_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            record_id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityItem {
    pub id: String,
    pub category: String,
    pub note: Option<String>,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryItem {
    pub id: String,
    pub content: String,
    pub source: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleplayItem {
    pub id: String,
    pub title: String,
    pub scenario: String,
    pub partner_role: String,
    pub goal: Option<String>,
    pub timestamp: String,
}

/// Activity list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityListResponse {
    pub items: Vec<ActivityItem>,
    /// Empty on success.
    pub message: String,
}

impl ActivityListResponse {
    fn ok(items: Vec<ActivityItem>) -> Self {
        Self {
            items,
            message: String::new(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            items: Vec::new(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryListResponse {
    pub items: Vec<MemoryItem>,
    /// Empty on success.
    pub message: String,
}

impl MemoryListResponse {
    fn ok(items: Vec<MemoryItem>) -> Self {
        Self {
            items,
            message: String::new(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            items: Vec::new(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleplayListResponse {
    pub items: Vec<RoleplayItem>,
    /// Empty on success.
    pub message: String,
}

impl RoleplayListResponse {
    fn ok(items: Vec<RoleplayItem>) -> Self {
        Self {
            items,
            message: String::new(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            items: Vec::new(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentResponse {
    pub ok: bool,
    pub total: u8,
    /// `minimal|mild|moderate|moderately_severe|severe`; empty on failure.
    pub severity: String,
    pub self_harm_flag: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageResponse {
    pub ok: bool,
    pub used: u32,
    /// `None` for unlimited plans.
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub message: String,
}

impl UsageResponse {
    fn from_snapshot(snapshot: UsageSnapshot) -> Self {
        Self {
            ok: true,
            used: snapshot.used,
            limit: snapshot.limit,
            remaining: snapshot.remaining(),
            message: String::new(),
        }
    }

    fn failure(message: String) -> Self {
        Self {
            ok: false,
            used: 0,
            limit: None,
            remaining: None,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainResponse {
    pub sent: u32,
    pub remaining: u32,
    pub message: String,
}

/// Logs one activity.
///
/// # FFI contract
/// - Sync call, DB-backed execution; never waits on the network.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_log(category: String, note: Option<String>) -> ActionResponse {
    let category = match category.parse::<ActivityCategory>() {
        Ok(category) => category,
        Err(err) => return ActionResponse::failure(format!("activity_log failed: {err}")),
    };
    match core().and_then(|core| {
        core.activity()
            .log(category, note.as_deref())
            .map_err(|err| err.to_string())
    }) {
        Ok(record) => ActionResponse::success("Activity logged.", record.id.to_string()),
        Err(err) => ActionResponse::failure(format!("activity_log failed: {err}")),
    }
}

/// Lists activities newest-first, optionally filtered by category.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_list(category: Option<String>) -> ActivityListResponse {
    let filter = match category.as_deref().map(str::parse::<ActivityCategory>) {
        Some(Err(err)) => {
            return ActivityListResponse::failure(format!("activity_list failed: {err}"))
        }
        Some(Ok(category)) => Some(category),
        None => None,
    };
    match core() {
        Ok(core) => {
            let records = match filter {
                Some(category) => core.activity().list_by_category(category),
                None => core.activity().list(),
            };
            ActivityListResponse::ok(records.into_iter().map(to_activity_item).collect())
        }
        Err(err) => ActivityListResponse::failure(format!("activity_list failed: {err}")),
    }
}

/// Stores a memory note; `source` is `chat|user`.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_remember(content: String, source: String) -> ActionResponse {
    let source = match source.parse::<MemorySource>() {
        Ok(source) => source,
        Err(err) => return ActionResponse::failure(format!("memory_remember failed: {err}")),
    };
    match core().and_then(|core| {
        core.memory()
            .remember(&content, source)
            .map_err(|err| err.to_string())
    }) {
        Ok(record) => ActionResponse::success("Memory saved.", record.id.to_string()),
        Err(err) => ActionResponse::failure(format!("memory_remember failed: {err}")),
    }
}

/// Lists memory notes oldest-first.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_list() -> MemoryListResponse {
    match core() {
        Ok(core) => MemoryListResponse::ok(
            core.memory()
                .list()
                .into_iter()
                .map(to_memory_item)
                .collect(),
        ),
        Err(err) => MemoryListResponse::failure(format!("memory_list failed: {err}")),
    }
}

/// Renders the most recent `max` notes as chat context.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_context(max: u32) -> String {
    match core() {
        Ok(core) => core.memory().context_block(max as usize),
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error call=memory_context error={err}");
            String::new()
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn roleplay_create(
    title: String,
    scenario: String,
    partner_role: String,
    goal: Option<String>,
) -> ActionResponse {
    let input = NewRoleplay {
        title,
        scenario,
        partner_role,
        goal,
    };
    match core().and_then(|core| core.roleplay().create(input).map_err(|err| err.to_string())) {
        Ok(record) => ActionResponse::success("Roleplay created.", record.id.to_string()),
        Err(err) => ActionResponse::failure(format!("roleplay_create failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn roleplay_list() -> RoleplayListResponse {
    match core() {
        Ok(core) => RoleplayListResponse::ok(
            core.roleplay()
                .list()
                .into_iter()
                .map(to_roleplay_item)
                .collect(),
        ),
        Err(err) => RoleplayListResponse::failure(format!("roleplay_list failed: {err}")),
    }
}

/// Deletes a roleplay. Deleting an unknown id succeeds with a message.
#[flutter_rust_bridge::frb(sync)]
pub fn roleplay_delete(id: String) -> ActionResponse {
    let id = match Uuid::parse_str(id.trim()) {
        Ok(id) => id,
        Err(err) => return ActionResponse::failure(format!("roleplay_delete failed: {err}")),
    };
    match core().and_then(|core| core.roleplay().delete(id).map_err(|err| err.to_string())) {
        Ok(true) => ActionResponse::success("Roleplay deleted.", id.to_string()),
        Ok(false) => ActionResponse::success("Roleplay not found.", id.to_string()),
        Err(err) => ActionResponse::failure(format!("roleplay_delete failed: {err}")),
    }
}

/// Sets the session used for remote mirroring.
#[flutter_rust_bridge::frb(sync)]
pub fn sign_in(user_id: String, access_token: String) -> String {
    if user_id.trim().is_empty() || access_token.trim().is_empty() {
        return "sign_in failed: user_id and access_token are required".to_string();
    }
    match core() {
        Ok(core) => {
            core.sign_in(Session::new(user_id.trim(), access_token.trim()));
            String::new()
        }
        Err(err) => format!("sign_in failed: {err}"),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn sign_out() -> String {
    match core() {
        Ok(core) => {
            core.sign_out();
            String::new()
        }
        Err(err) => format!("sign_out failed: {err}"),
    }
}

/// Runs one outbox drain pass over every store.
///
/// # FFI contract
/// - Async call; awaits remote writes on the core runtime.
/// - Reports zero counts when mirroring uses the one-shot policy.
pub async fn outbox_drain() -> DrainResponse {
    let (core, runtime) = match core().and_then(|core| Ok((core, runtime()?))) {
        Ok(pair) => pair,
        Err(err) => {
            return DrainResponse {
                sent: 0,
                remaining: 0,
                message: format!("outbox_drain failed: {err}"),
            }
        }
    };

    match runtime.spawn(core.drain_outboxes()).await {
        Ok(outcomes) => summarize_drain(&outcomes),
        Err(err) => DrainResponse {
            sent: 0,
            remaining: 0,
            message: format!("outbox_drain failed: {err}"),
        },
    }
}

/// Scores a PHQ-9 (`phq9`) or GAD-7 (`gad7`) questionnaire.
#[flutter_rust_bridge::frb(sync)]
pub fn score_assessment(questionnaire: String, answers: Vec<u8>) -> AssessmentResponse {
    let failure = |message: String| AssessmentResponse {
        ok: false,
        total: 0,
        severity: String::new(),
        self_harm_flag: false,
        message,
    };

    let questionnaire = match questionnaire.trim().to_ascii_lowercase().as_str() {
        "phq9" | "phq-9" => Questionnaire::Phq9,
        "gad7" | "gad-7" => Questionnaire::Gad7,
        other => return failure(format!("unknown questionnaire `{other}`")),
    };
    match score(questionnaire, &answers) {
        Ok(result) => AssessmentResponse {
            ok: true,
            total: result.total,
            severity: severity_label(result.severity),
            self_harm_flag: result.self_harm_flag,
            message: String::new(),
        },
        Err(err) => failure(format!("score_assessment failed: {err}")),
    }
}

/// Counts one sent chat message against today's quota.
#[flutter_rust_bridge::frb(sync)]
pub fn usage_record_message(premium: bool) -> UsageResponse {
    match core().and_then(|core| {
        core.usage()
            .record_message(plan(premium))
            .map_err(|err| err.to_string())
    }) {
        Ok(snapshot) => UsageResponse::from_snapshot(snapshot),
        Err(err) => UsageResponse::failure(format!("usage_record_message failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn usage_snapshot(premium: bool) -> UsageResponse {
    match core() {
        Ok(core) => UsageResponse::from_snapshot(core.usage().snapshot(plan(premium))),
        Err(err) => UsageResponse::failure(format!("usage_snapshot failed: {err}")),
    }
}

fn plan(premium: bool) -> Plan {
    if premium {
        Plan::Premium
    } else {
        Plan::Free
    }
}

fn runtime() -> Result<&'static Runtime, String> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("auri-mirror")
        .enable_all()
        .build()
        .map_err(|err| format!("runtime start failed: {err}"))?;
    Ok(RUNTIME.get_or_init(|| runtime))
}

fn core() -> Result<&'static AuriCore, String> {
    if let Some(core) = CORE.get() {
        return Ok(core);
    }
    install_core(build_config(None, None)?)
}

/// Opens and publishes the core once; concurrent first calls wait here and
/// reuse the winner, so outbox loops are spawned exactly once.
fn install_core(config: CoreConfig) -> Result<&'static AuriCore, String> {
    let _init = CORE_INIT.lock().unwrap_or_else(|err| err.into_inner());
    if let Some(core) = CORE.get() {
        return Ok(core);
    }
    let runtime = runtime()?;
    let policy = config.mirror_policy;
    let core = AuriCore::open(config, runtime.handle().clone())
        .map_err(|err| format!("core open failed: {err}"))?;
    let core = CORE.get_or_init(|| core);
    if policy == MirrorPolicy::Outbox {
        let loops = core.spawn_outbox_loops();
        info!(
            "event=outbox_loop module=ffi status=ok stores={}",
            loops.len()
        );
    }
    Ok(core)
}

fn build_config(db_path: Option<String>, config_json: Option<&str>) -> Result<CoreConfig, String> {
    let mut config = match config_json.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => CoreConfig::from_json_str(raw).map_err(|err| err.to_string())?,
        None => CoreConfig {
            db_path: std::env::temp_dir().join(FFI_DB_FILE_NAME),
            ..CoreConfig::default()
        },
    };

    let explicit = db_path
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty());
    let from_env = std::env::var(ENV_DB_PATH)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty());
    if let Some(path) = explicit.or(from_env) {
        config.db_path = PathBuf::from(path);
    }

    config
        .apply_env_overrides(|name| std::env::var(name).ok())
        .map_err(|err| err.to_string())?;
    Ok(config)
}

fn summarize_drain(outcomes: &[DrainOutcome]) -> DrainResponse {
    let mut response = DrainResponse {
        sent: 0,
        remaining: 0,
        message: String::new(),
    };
    for outcome in outcomes {
        match outcome {
            DrainOutcome::Completed { sent, remaining } => {
                response.sent += *sent as u32;
                response.remaining += *remaining as u32;
            }
            DrainOutcome::NoSession => response.message = "No session.".to_string(),
            DrainOutcome::Unreadable => response.message = "Outbox unreadable.".to_string(),
            DrainOutcome::AlreadyRunning => {}
        }
    }
    response
}

fn severity_label(severity: Severity) -> String {
    serde_json::to_value(severity)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn to_activity_item(record: Record<ActivityLog>) -> ActivityItem {
    ActivityItem {
        id: record.id.to_string(),
        category: record.payload.category.as_str().to_string(),
        note: record.payload.note,
        timestamp: record.timestamp.to_rfc3339(),
    }
}

fn to_memory_item(record: Record<MemoryNote>) -> MemoryItem {
    MemoryItem {
        id: record.id.to_string(),
        content: record.payload.content,
        source: record.payload.source.as_str().to_string(),
        timestamp: record.timestamp.to_rfc3339(),
    }
}

fn to_roleplay_item(record: Record<CustomRoleplay>) -> RoleplayItem {
    RoleplayItem {
        id: record.id.to_string(),
        title: record.payload.title,
        scenario: record.payload.scenario,
        partner_role: record.payload.partner_role,
        goal: record.payload.goal,
        timestamp: record.timestamp.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        activity_list, activity_log, core, core_version, init_logging, memory_context,
        memory_list, memory_remember, ping, roleplay_create, roleplay_delete, roleplay_list,
        score_assessment, sign_in, sign_out, summarize_drain, usage_record_message,
        usage_snapshot,
    };
    use auri_core::DrainOutcome;
    use std::thread;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn activity_log_then_list_by_category() {
        let token = unique_token("activity");
        let created = activity_log("journal".to_string(), Some(token.clone()));
        assert!(created.ok, "{}", created.message);
        let created_id = created.record_id.expect("log should return record_id");

        let response = activity_list(Some("journal".to_string()));
        assert!(response.message.is_empty(), "{}", response.message);
        let item = response
            .items
            .iter()
            .find(|item| item.id == created_id)
            .expect("logged activity should be listed");
        assert_eq!(item.note.as_deref(), Some(token.as_str()));
        assert!(response.items.iter().all(|item| item.category == "journal"));
    }

    #[test]
    fn activity_log_rejects_unknown_category() {
        let response = activity_log("juggling".to_string(), None);
        assert!(!response.ok);
        assert!(response.message.contains("juggling"));
    }

    #[test]
    fn memory_remember_appears_in_list_and_context() {
        let token = unique_token("memory");
        let created = memory_remember(token.clone(), "user".to_string());
        assert!(created.ok, "{}", created.message);

        assert!(memory_list().items.iter().any(|item| item.content == token));
        assert!(memory_context(50).contains(&token));
    }

    #[test]
    fn roleplay_create_and_delete() {
        let title = unique_token("roleplay");
        let created = roleplay_create(
            title.clone(),
            "setting boundaries".to_string(),
            String::new(),
            None,
        );
        assert!(created.ok, "{}", created.message);
        let id = created.record_id.expect("create should return record_id");
        assert!(roleplay_list().items.iter().any(|item| item.title == title));

        let deleted = roleplay_delete(id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert!(!roleplay_list().items.iter().any(|item| item.id == id));

        let missing = roleplay_delete(id);
        assert!(missing.ok);
        assert_eq!(missing.message, "Roleplay not found.");

        assert!(!roleplay_delete("not-a-uuid".to_string()).ok);
    }

    #[test]
    fn score_assessment_reports_severity_and_flag() {
        let response = score_assessment("PHQ9".to_string(), vec![2, 2, 2, 2, 2, 2, 2, 1, 1]);
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.total, 16);
        assert_eq!(response.severity, "moderately_severe");
        assert!(response.self_harm_flag);

        let invalid = score_assessment("gad7".to_string(), vec![0; 3]);
        assert!(!invalid.ok);
    }

    #[test]
    fn usage_premium_is_unlimited() {
        let response = usage_record_message(true);
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.limit, None);

        let free = usage_snapshot(false);
        assert!(free.ok, "{}", free.message);
        assert!(free.limit.is_some());
    }

    #[test]
    fn sign_in_requires_credentials() {
        assert!(!sign_in(String::new(), "token".to_string()).is_empty());
        assert!(sign_in("user-1".to_string(), "token".to_string()).is_empty());
        assert!(sign_out().is_empty());
    }

    #[test]
    fn concurrent_first_calls_share_one_core() {
        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| core().map(|core| core as *const _ as usize)))
            .collect();
        let addresses: Vec<usize> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked").expect("core open"))
            .collect();
        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn summarize_drain_does_not_hide_unreadable_outbox() {
        let response = summarize_drain(&[
            DrainOutcome::Completed {
                sent: 2,
                remaining: 1,
            },
            DrainOutcome::Unreadable,
            DrainOutcome::AlreadyRunning,
        ]);
        assert_eq!(response.sent, 2);
        assert_eq!(response.remaining, 1);
        assert_eq!(response.message, "Outbox unreadable.");
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
