//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose entry creation and the auto-save engine to Dart via FRB.
//! - Own the process-wide Tokio runtime and auto-save handle.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Edits are fire-and-forget; only force save and shutdown block on I/O.
//! - The service mutex is never held while awaiting a flush.

use jotter_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AutoSaveConfig, AutoSaveService, BatchWriteOutcome, EntryId, EntryKind, EntryService,
    FieldChange, SaveStatus, SqliteEntryRepository, SqliteEntryStore,
};
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

const RUNTIME_WORKER_THREADS: usize = 2;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static AUTOSAVE: Mutex<Option<AutoSaveService<SqliteEntryStore>>> = Mutex::new(None);

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

/// Generic action response envelope for entry commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Created entry ID in string form.
    pub entry_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, entry_id: EntryId) -> Self {
        Self {
            ok: true,
            entry_id: Some(entry_id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            entry_id: None,
            message: message.into(),
        }
    }
}

/// Save indicator snapshot for the editor chrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveStatusView {
    /// `idle|saving|saved|error`.
    pub state: String,
    /// Short user-facing text; empty when idle.
    pub message: String,
    /// `gray|blue|green|red`.
    pub color: String,
    /// Epoch milliseconds of the last successful save.
    pub saved_at: Option<i64>,
}

impl From<&SaveStatus> for AutoSaveStatusView {
    fn from(status: &SaveStatus) -> Self {
        Self {
            state: status.as_str().to_string(),
            message: status.message(),
            color: status.display_color().as_str().to_string(),
            saved_at: match status {
                SaveStatus::Saved { at } => Some(*at),
                _ => None,
            },
        }
    }
}

/// Result of a blocking save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveFlushResponse {
    pub ok: bool,
    /// Entries written by this call.
    pub committed: u32,
    /// Entries whose edits were dropped because the entry no longer exists.
    pub dropped: u32,
    pub message: String,
}

impl AutoSaveFlushResponse {
    fn from_result(result: Result<BatchWriteOutcome, String>) -> Self {
        match result {
            Ok(outcome) => Self {
                ok: true,
                committed: count(outcome.committed.len()),
                dropped: count(outcome.missing.len()),
                message: format!("Saved {} entr(y/ies).", outcome.committed.len()),
            },
            Err(message) => Self {
                ok: false,
                committed: 0,
                dropped: 0,
                message,
            },
        }
    }
}

/// Opens the entry database and starts auto-save.
///
/// Input semantics:
/// - `db_path`: SQLite file path; created and migrated when missing.
/// - `config_json`: optional partial `AutoSaveConfig` JSON object (omitted
///   keys keep their defaults) or a preset name (`default|background`).
///
/// # FFI contract
/// - Sync call; opens the database.
/// - Fails when auto-save is already running.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_start(db_path: String, config_json: Option<String>) -> String {
    match start_service(db_path.trim(), config_json.as_deref()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Creates an entry (`note|journal|task`) in the auto-saved database.
///
/// # FFI contract
/// - Sync call, DB-backed; waits for an in-flight batch write.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_create(kind: String, title: String, content: String) -> EntryActionResponse {
    let Some(kind) = EntryKind::parse(kind.trim()) else {
        return EntryActionResponse::failure(format!(
            "entry_create failed: unsupported kind `{}`",
            kind.trim()
        ));
    };
    let service = match current_service() {
        Ok(service) => service,
        Err(err) => return EntryActionResponse::failure(format!("entry_create failed: {err}")),
    };

    let created = service.with_store(|store| {
        let entries = EntryService::new(SqliteEntryRepository::new(store.connection()));
        match kind {
            EntryKind::Note => entries.create_note(title.trim(), content),
            EntryKind::Journal => entries.create_journal(title.trim(), content),
            EntryKind::Task => entries.create_task(title.trim(), None),
        }
    });
    match created {
        Ok(id) => EntryActionResponse::success(format!("Created {kind}."), id),
        Err(err) => EntryActionResponse::failure(format!("entry_create failed: {err}")),
    }
}

/// Buffers a title edit.
///
/// # FFI contract
/// - Sync call, non-blocking; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_set_title(entry_id: String, title: String) -> String {
    register(&entry_id, FieldChange::Title(title))
}

/// Buffers a markdown content edit.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_set_content(entry_id: String, content: String) -> String {
    register(&entry_id, FieldChange::Content(content))
}

#[flutter_rust_bridge::frb(sync)]
pub fn autosave_set_pinned(entry_id: String, pinned: bool) -> String {
    register(&entry_id, FieldChange::Pinned(pinned))
}

#[flutter_rust_bridge::frb(sync)]
pub fn autosave_set_favorite(entry_id: String, favorite: bool) -> String {
    register(&entry_id, FieldChange::Favorite(favorite))
}

/// Buffers a task completion toggle. Ignored at write time for non-tasks.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_set_completed(entry_id: String, completed: bool) -> String {
    register(&entry_id, FieldChange::Completed(completed))
}

/// Buffers a task due date in epoch milliseconds; `None` clears it.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_set_due_at(entry_id: String, due_at: Option<i64>) -> String {
    register(&entry_id, FieldChange::DueAt(due_at))
}

/// Writes every pending edit before returning.
///
/// # FFI contract
/// - Sync call; blocks the calling thread until the buffer is drained.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_force_save() -> AutoSaveFlushResponse {
    let result = current_service().and_then(|service| {
        runtime()?
            .block_on(service.force_save())
            .map_err(|err| err.to_string())
    });
    AutoSaveFlushResponse::from_result(result)
}

/// Current save indicator. Reports `idle` when auto-save is not running.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_status() -> AutoSaveStatusView {
    let status = current_service()
        .map(|service| service.status())
        .unwrap_or(SaveStatus::Idle);
    AutoSaveStatusView::from(&status)
}

/// Number of entries with unsaved edits.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_pending_count() -> u32 {
    current_service()
        .map(|service| count(service.pending_changes_count()))
        .unwrap_or(0)
}

/// Discards unsaved edits for one entry, e.g. after the user deleted it.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_clear(entry_id: String) -> String {
    match current_service().and_then(|service| Ok((service, parse_entry_id(&entry_id)?))) {
        Ok((service, id)) => {
            service.clear_pending_changes(id);
            String::new()
        }
        Err(err) => err,
    }
}

/// Host memory warning hook; starts an immediate background flush.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_memory_warning() -> String {
    match current_service() {
        Ok(service) => {
            service.handle_memory_pressure();
            String::new()
        }
        Err(err) => err,
    }
}

/// Drains pending edits and stops auto-save. A later `autosave_start` may
/// reopen it.
///
/// # FFI contract
/// - Sync call; blocks until the final flush finished.
/// - Unsaved edits that could not be written are discarded.
#[flutter_rust_bridge::frb(sync)]
pub fn autosave_shutdown() -> AutoSaveFlushResponse {
    let Some(service) = lock_service().take() else {
        return AutoSaveFlushResponse::from_result(Err("auto-save is not running".to_string()));
    };
    let result = runtime().and_then(|runtime| {
        runtime
            .block_on(service.shutdown())
            .map_err(|err| err.to_string())
    });
    info!(
        "event=ffi_autosave_shutdown module=ffi status={}",
        if result.is_ok() { "ok" } else { "error" }
    );
    AutoSaveFlushResponse::from_result(result)
}

fn start_service(db_path: &str, config_json: Option<&str>) -> Result<(), String> {
    if db_path.is_empty() {
        return Err("db_path cannot be empty".to_string());
    }
    let config = parse_config(config_json)?;

    let mut slot = lock_service();
    if slot.is_some() {
        return Err("auto-save is already running".to_string());
    }

    let store =
        SqliteEntryStore::open(db_path).map_err(|err| format!("entry DB open failed: {err}"))?;
    let runtime = runtime()?;
    let _entered = runtime.enter();
    let service = AutoSaveService::start(store, config).map_err(|err| err.to_string())?;
    *slot = Some(service);

    info!("event=ffi_autosave_start module=ffi status=ok");
    Ok(())
}

fn parse_config(config_json: Option<&str>) -> Result<AutoSaveConfig, String> {
    match config_json.map(str::trim) {
        None | Some("") => Ok(AutoSaveConfig::default()),
        Some(raw) if raw.starts_with('{') => {
            serde_json::from_str(raw).map_err(|err| format!("invalid auto-save config: {err}"))
        }
        Some(name) => AutoSaveConfig::preset(name)
            .ok_or_else(|| format!("unknown auto-save preset `{name}`")),
    }
}

fn parse_entry_id(raw: &str) -> Result<EntryId, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid entry_id `{}`", raw.trim()))
}

fn register(entry_id: &str, change: FieldChange) -> String {
    let field = change.key();
    let registered = parse_entry_id(entry_id)
        .and_then(|id| current_service().map(|service| service.register_change(id, change)));
    match registered {
        Ok(()) => String::new(),
        Err(err) => {
            warn!("event=ffi_autosave_register module=ffi status=error field={field}");
            err
        }
    }
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .worker_threads(RUNTIME_WORKER_THREADS)
            .thread_name("jotter-autosave")
            .enable_time()
            .build()
            .map_err(|err| format!("failed to start auto-save runtime: {err}"))
    })
}

/// Clones the running handle so the static mutex is released before any
/// blocking work.
fn current_service() -> Result<AutoSaveService<SqliteEntryStore>, String> {
    lock_service()
        .clone()
        .ok_or_else(|| "auto-save is not running; call autosave_start first".to_string())
}

fn lock_service() -> MutexGuard<'static, Option<AutoSaveService<SqliteEntryStore>>> {
    AUTOSAVE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
