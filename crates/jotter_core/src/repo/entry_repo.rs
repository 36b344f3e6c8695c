//! Entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `entries` storage.
//! - Keep SQL details inside core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Entry::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Listing is always ordered by `updated_at DESC, uuid ASC`.

use crate::db::DbError;
use crate::model::entry::{Entry, EntryId, EntryKind, EntryValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    kind,
    title,
    content,
    preview_text,
    is_pinned,
    is_favorite,
    is_completed,
    due_at,
    created_at,
    updated_at,
    is_deleted
FROM entries";

const ENTRIES_DEFAULT_LIMIT: u32 = 20;
const ENTRIES_LIMIT_MAX: u32 = 100;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    NotFound(EntryId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryListQuery {
    pub kind: Option<EntryKind>,
    pub include_deleted: bool,
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for entry CRUD operations.
pub trait EntryRepository {
    fn create_entry(&self, entry: &Entry) -> RepoResult<EntryId>;
    /// Overwrites every column, including `updated_at`, from `entry`.
    fn update_entry(&self, entry: &Entry) -> RepoResult<()>;
    fn get_entry(&self, id: EntryId, include_deleted: bool) -> RepoResult<Option<Entry>>;
    fn list_entries(&self, query: &EntryListQuery) -> RepoResult<Vec<Entry>>;
    fn soft_delete_entry(&self, id: EntryId) -> RepoResult<()>;
}

/// SQLite-backed entry repository borrowing a migrated connection.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(&self, entry: &Entry) -> RepoResult<EntryId> {
        entry.validate()?;

        self.conn.execute(
            "INSERT INTO entries (
                uuid,
                kind,
                title,
                content,
                preview_text,
                is_pinned,
                is_favorite,
                is_completed,
                due_at,
                created_at,
                updated_at,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                entry.uuid.to_string(),
                entry.kind.as_str(),
                entry.title.as_str(),
                entry.content.as_str(),
                entry.preview_text.as_deref(),
                entry.is_pinned,
                entry.is_favorite,
                entry.is_completed,
                entry.due_at,
                entry.created_at,
                entry.updated_at,
                entry.is_deleted,
            ],
        )?;

        Ok(entry.uuid)
    }

    fn update_entry(&self, entry: &Entry) -> RepoResult<()> {
        entry.validate()?;

        let changed = self.conn.execute(
            "UPDATE entries
             SET
                kind = ?1,
                title = ?2,
                content = ?3,
                preview_text = ?4,
                is_pinned = ?5,
                is_favorite = ?6,
                is_completed = ?7,
                due_at = ?8,
                updated_at = ?9,
                is_deleted = ?10
             WHERE uuid = ?11;",
            params![
                entry.kind.as_str(),
                entry.title.as_str(),
                entry.content.as_str(),
                entry.preview_text.as_deref(),
                entry.is_pinned,
                entry.is_favorite,
                entry.is_completed,
                entry.due_at,
                entry.updated_at,
                entry.is_deleted,
                entry.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(entry.uuid));
        }

        Ok(())
    }

    fn get_entry(&self, id: EntryId, include_deleted: bool) -> RepoResult<Option<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }

        Ok(None)
    }

    fn list_entries(&self, query: &EntryListQuery) -> RepoResult<Vec<Entry>> {
        let mut sql = format!("{ENTRY_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_entry_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }

        Ok(entries)
    }

    fn soft_delete_entry(&self, id: EntryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE entries
             SET
                is_deleted = 1,
                updated_at = MAX(updated_at, strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

/// Normalizes list limit according to the entries contract.
pub fn normalize_entry_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => ENTRIES_DEFAULT_LIMIT,
        Some(value) => value.min(ENTRIES_LIMIT_MAX),
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in entries.uuid"))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = EntryKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid entry kind `{kind_text}` in entries.kind"))
    })?;

    let entry = Entry {
        uuid,
        kind,
        title: row.get("title")?,
        content: row.get("content")?,
        preview_text: row.get("preview_text")?,
        is_pinned: parse_flag(row, "is_pinned")?,
        is_favorite: parse_flag(row, "is_favorite")?,
        is_completed: parse_flag(row, "is_completed")?,
        due_at: row.get("due_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_deleted: parse_flag(row, "is_deleted")?,
    };
    entry.validate()?;
    Ok(entry)
}

fn parse_flag(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in entries.{column}"
        ))),
    }
}
