//! Debounced write-coalescing auto-save.
//!
//! # Responsibility
//! - Buffer per-entry field edits in memory (`buffer`).
//! - Decide when to flush: debounce plus periodic floor (`scheduler`).
//! - Write bounded batches transactionally (`writer`).
//! - Expose save progress to the UI (`status`).
//!
//! # Invariants
//! - Failures are local to one flush; the next trigger retries them.
//! - No operation here is fatal to the process.

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod buffer;
pub mod config;
pub mod scheduler;
mod service;
pub mod status;
pub mod writer;

pub use buffer::{PendingChanges, PendingEntry};
pub use config::{AutoSaveConfig, ConfigError};
pub use service::{AutoSaveService, FlushReport};
pub use status::{SaveStatus, StatusColor};
pub use writer::BatchWriteOutcome;

/// Auto-save failure.
#[derive(Debug)]
pub enum AutoSaveError {
    /// Rejected configuration.
    Config(ConfigError),
    /// `AutoSaveService::start` was called outside a Tokio runtime.
    NoRuntime,
    /// The durable store failed; the batch stays buffered.
    Store(StoreError),
    /// The blocking write task panicked or was cancelled.
    WriterPanicked(String),
}

impl AutoSaveError {
    /// Critical errors stay visible until the next flush; others auto-clear.
    pub fn is_critical(&self) -> bool {
        match self {
            Self::Store(err) => !err.is_transient(),
            Self::Config(_) | Self::NoRuntime | Self::WriterPanicked(_) => true,
        }
    }
}

impl Display for AutoSaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid auto-save config: {err}"),
            Self::NoRuntime => write!(f, "auto-save requires a running Tokio runtime"),
            Self::Store(err) => write!(f, "{err}"),
            Self::WriterPanicked(details) => write!(f, "auto-save writer aborted: {details}"),
        }
    }
}

impl Error for AutoSaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NoRuntime | Self::WriterPanicked(_) => None,
        }
    }
}

impl From<ConfigError> for AutoSaveError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for AutoSaveError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
