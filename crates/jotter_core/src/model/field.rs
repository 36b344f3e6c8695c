//! Typed field edits buffered by auto-save.
//!
//! Each variant carries the new value for exactly one entry column, so the
//! pending-change buffer never holds untyped values.

use crate::model::entry::{Entry, EntryKind, EntryValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Discriminant of a [`FieldChange`]; the last-write-wins key per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Title,
    Content,
    Pinned,
    Favorite,
    Completed,
    DueAt,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
            Self::Pinned => "is_pinned",
            Self::Favorite => "is_favorite",
            Self::Completed => "is_completed",
            Self::DueAt => "due_at",
        }
    }

    /// Returns whether entries of `kind` carry this field.
    pub fn applies_to(self, kind: EntryKind) -> bool {
        match self {
            Self::Completed | Self::DueAt => kind == EntryKind::Task,
            Self::Title | Self::Content | Self::Pinned | Self::Favorite => true,
        }
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending edit with its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Title(String),
    Content(String),
    Pinned(bool),
    Favorite(bool),
    Completed(bool),
    /// Unix epoch milliseconds, `None` clears the due date.
    DueAt(Option<i64>),
}

impl FieldChange {
    pub fn key(&self) -> FieldKey {
        match self {
            Self::Title(_) => FieldKey::Title,
            Self::Content(_) => FieldKey::Content,
            Self::Pinned(_) => FieldKey::Pinned,
            Self::Favorite(_) => FieldKey::Favorite,
            Self::Completed(_) => FieldKey::Completed,
            Self::DueAt(_) => FieldKey::DueAt,
        }
    }

    /// Writes this value into `entry`.
    ///
    /// # Errors
    /// - Returns `TaskFieldOnNonTask` when the field does not exist on the
    ///   entry kind; `entry` is left untouched in that case.
    pub fn apply_to(&self, entry: &mut Entry) -> Result<(), EntryValidationError> {
        let key = self.key();
        if !key.applies_to(entry.kind) {
            return Err(EntryValidationError::TaskFieldOnNonTask {
                kind: entry.kind,
                field: key.as_str(),
            });
        }

        match self {
            Self::Title(value) => entry.title.clone_from(value),
            Self::Content(value) => entry.content.clone_from(value),
            Self::Pinned(value) => entry.is_pinned = *value,
            Self::Favorite(value) => entry.is_favorite = *value,
            Self::Completed(value) => entry.is_completed = *value,
            Self::DueAt(value) => entry.due_at = *value,
        }
        Ok(())
    }
}
