//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by note/journal/task projections.
//! - Provide lifecycle helpers for soft-delete semantics.
//! - Validate kind-specific fields before persistence.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another entry.
//! - `is_completed` and `due_at` are meaningful only for tasks.
//! - `updated_at` is never earlier than `created_at`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier correlating in-memory edits with a durable entry.
pub type EntryId = Uuid;

/// Category of an entry. One storage shape serves all three screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Free-form markdown note.
    Note,
    /// Dated journal entry.
    Journal,
    /// Actionable task with completion and due date.
    Task,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Journal => "journal",
            Self::Task => "task",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "note" => Some(Self::Note),
            "journal" => Some(Self::Journal),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for entry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    /// A task-only field was set on a non-task entry.
    TaskFieldOnNonTask { kind: EntryKind, field: &'static str },
    /// `updated_at` precedes `created_at`.
    UpdatedBeforeCreated { created_at: i64, updated_at: i64 },
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskFieldOnNonTask { kind, field } => {
                write!(f, "field `{field}` is only valid for tasks, entry is a {kind}")
            }
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updated_at {updated_at} must not be earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for EntryValidationError {}

/// Canonical durable record for note/journal/task data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub uuid: EntryId,
    pub kind: EntryKind,
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Plain-text summary derived from `content`.
    pub preview_text: Option<String>,
    pub is_pinned: bool,
    pub is_favorite: bool,
    /// Task-only.
    pub is_completed: bool,
    /// Task-only. Unix epoch milliseconds.
    pub due_at: Option<i64>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Bumped by every successful write.
    pub updated_at: i64,
    /// Soft delete tombstone.
    pub is_deleted: bool,
}

impl Entry {
    /// Creates a new entry with a generated stable ID.
    pub fn new(kind: EntryKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, title, content)
    }

    /// Creates a new entry with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        uuid: EntryId,
        kind: EntryKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            uuid,
            kind,
            title: title.into(),
            content: content.into(),
            preview_text: None,
            is_pinned: false,
            is_favorite: false,
            is_completed: false,
            due_at: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Checks kind-specific field rules.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.kind != EntryKind::Task {
            if self.is_completed {
                return Err(EntryValidationError::TaskFieldOnNonTask {
                    kind: self.kind,
                    field: "is_completed",
                });
            }
            if self.due_at.is_some() {
                return Err(EntryValidationError::TaskFieldOnNonTask {
                    kind: self.kind,
                    field: "due_at",
                });
            }
        }

        if self.updated_at < self.created_at {
            return Err(EntryValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }

        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Clamps to `0` if the system clock reports a pre-epoch time.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryKind, EntryValidationError};

    #[test]
    fn kind_round_trips_through_db_text() {
        for kind in [EntryKind::Note, EntryKind::Journal, EntryKind::Task] {
            assert_eq!(EntryKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::parse("event"), None);
    }

    #[test]
    fn due_date_on_note_is_rejected() {
        let mut entry = Entry::new(EntryKind::Note, "n", "");
        entry.due_at = Some(1_700_000_000_000);
        assert_eq!(
            entry.validate(),
            Err(EntryValidationError::TaskFieldOnNonTask {
                kind: EntryKind::Note,
                field: "due_at",
            })
        );
    }

    #[test]
    fn task_fields_are_valid_on_tasks() {
        let mut entry = Entry::new(EntryKind::Task, "t", "");
        entry.is_completed = true;
        entry.due_at = Some(1_700_000_000_000);
        assert!(entry.validate().is_ok());
    }
}
