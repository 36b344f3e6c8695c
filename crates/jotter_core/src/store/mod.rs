//! Durable store contract consumed by the auto-save batch writer.
//!
//! # Responsibility
//! - Describe the minimal transactional surface auto-save needs: single
//!   record lookup by id plus a multi-record commit.
//! - Classify store failures as transient or critical.
//!
//! # Invariants
//! - `find`/`stage` are only called between `begin` and `commit`/`rollback`.
//! - A failed `commit` leaves no staged record persisted.

use crate::model::entry::{Entry, EntryId};
use crate::repo::entry_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite_store;

pub use sqlite_store::SqliteEntryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by an [`EntryStore`].
#[derive(Debug)]
pub enum StoreError {
    /// Repository/database failure.
    Repo(RepoError),
    /// `find`/`stage`/`commit` called without an open transaction.
    NoTransaction,
    /// `begin` called while a transaction is already open.
    TransactionOpen,
    /// Failure from a non-SQLite backend.
    Backend { message: String, transient: bool },
}

impl StoreError {
    /// Returns whether retrying the same write later is expected to succeed.
    ///
    /// Only lock contention counts as transient for SQLite.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Repo(RepoError::Db(err)) => err.is_busy(),
            Self::Backend { transient, .. } => *transient,
            Self::Repo(_) | Self::NoTransaction | Self::TransactionOpen => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::NoTransaction => write!(f, "no open store transaction"),
            Self::TransactionOpen => write!(f, "store transaction already open"),
            Self::Backend { message, .. } => write!(f, "{message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Key-addressable record store with explicit transaction boundaries.
///
/// Implementations are driven from a blocking worker thread, never from an
/// async task, so they may perform synchronous I/O freely.
pub trait EntryStore: Send {
    fn begin(&mut self) -> StoreResult<()>;
    /// Returns the live (non-deleted) entry for `id`, if any.
    fn find(&mut self, id: EntryId) -> StoreResult<Option<Entry>>;
    /// Writes `entry` inside the open transaction.
    fn stage(&mut self, entry: &Entry) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    /// Discards the open transaction. A no-op when none is open.
    fn rollback(&mut self);
}
