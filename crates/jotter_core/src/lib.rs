//! Core domain logic for Jotter.
//! Owns entry storage and the debounced auto-save engine that writes UI
//! edits back to it.

pub mod autosave;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use autosave::{
    AutoSaveConfig, AutoSaveError, AutoSaveService, BatchWriteOutcome, ConfigError, FlushReport,
    SaveStatus, StatusColor,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entry::{now_epoch_ms, Entry, EntryId, EntryKind, EntryValidationError};
pub use model::field::{FieldChange, FieldKey};
pub use repo::entry_repo::{
    EntryListQuery, EntryRepository, RepoError, RepoResult, SqliteEntryRepository,
};
pub use service::entry_service::{derive_markdown_preview, EntryService};
pub use store::{EntryStore, SqliteEntryStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
