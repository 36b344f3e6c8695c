//! SQLite implementation of [`EntryStore`].
//!
//! Owns its connection so it can move onto the blocking pool. Transactions
//! are driven with explicit `BEGIN IMMEDIATE`/`COMMIT`/`ROLLBACK` statements
//! because their lifetime spans several trait calls.

use super::{EntryStore, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::entry::{Entry, EntryId};
use crate::repo::entry_repo::{EntryRepository, SqliteEntryRepository};
use log::warn;
use rusqlite::Connection;
use std::path::Path;

pub struct SqliteEntryStore {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteEntryStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    /// Borrows the connection, e.g. for CRUD through [`SqliteEntryRepository`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_transaction(&self) -> StoreResult<()> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StoreError::NoTransaction)
        }
    }
}

impl EntryStore for SqliteEntryStore {
    fn begin(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            return Err(StoreError::TransactionOpen);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        self.in_transaction = true;
        Ok(())
    }

    fn find(&mut self, id: EntryId) -> StoreResult<Option<Entry>> {
        self.ensure_transaction()?;
        Ok(SqliteEntryRepository::new(&self.conn).get_entry(id, false)?)
    }

    fn stage(&mut self, entry: &Entry) -> StoreResult<()> {
        self.ensure_transaction()?;
        Ok(SqliteEntryRepository::new(&self.conn).update_entry(entry)?)
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.ensure_transaction()?;
        self.conn.execute_batch("COMMIT;")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) {
        if !self.in_transaction {
            return;
        }
        // A failed COMMIT may already have ended the transaction; SQLite then
        // reports "no transaction is active", which is safe to ignore.
        if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
            if !self.conn.is_autocommit() {
                warn!("event=store_rollback module=store status=error error={err}");
            }
        }
        self.in_transaction = false;
    }
}
