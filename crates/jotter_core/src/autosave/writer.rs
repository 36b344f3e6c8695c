//! Batch writer: applies one snapshot of pending edits in a transaction.
//!
//! # Invariants
//! - Either every found entry in the batch is committed or none is.
//! - Entries that no longer resolve are reported as `missing`, never as
//!   failures; their edits are moot.
//! - Runs synchronously; callers move it onto a blocking thread.

use crate::autosave::buffer::PendingEntry;
use crate::model::entry::{Entry, EntryId};
use crate::model::field::FieldKey;
use crate::service::entry_service::refresh_preview;
use crate::store::{EntryStore, StoreResult};
use log::{debug, warn};

/// Per-flush result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteOutcome {
    /// Written and acknowledged in the buffer.
    pub committed: Vec<EntryId>,
    /// No live record; dropped from the buffer without retry.
    pub missing: Vec<EntryId>,
    /// Part of a failed transaction; still buffered for the next flush.
    pub failed: Vec<EntryId>,
    /// Entries left buffered because the batch was full.
    pub deferred: usize,
}

impl BatchWriteOutcome {
    /// Folds a later batch into this one; `deferred` takes the later value.
    pub fn merge(&mut self, later: BatchWriteOutcome) {
        self.committed.extend(later.committed);
        self.missing.extend(later.missing);
        self.failed.extend(later.failed);
        self.deferred = later.deferred;
    }
}

/// Writes `batch` to `store` in one transaction stamped with `modified_at`.
///
/// Changes that do not apply to an entry's kind are skipped; the rest of
/// that entry's changes are still written.
///
/// # Errors
/// - Any store failure rolls the transaction back and is returned as-is.
pub fn write_batch<S>(
    store: &mut S,
    batch: &[PendingEntry],
    modified_at: i64,
) -> StoreResult<BatchWriteOutcome>
where
    S: EntryStore + ?Sized,
{
    store.begin()?;
    let result = stage_batch(&mut *store, batch, modified_at)
        .and_then(|outcome| store.commit().map(|()| outcome));
    if result.is_err() {
        store.rollback();
    }
    result
}

fn stage_batch<S>(
    store: &mut S,
    batch: &[PendingEntry],
    modified_at: i64,
) -> StoreResult<BatchWriteOutcome>
where
    S: EntryStore + ?Sized,
{
    let mut outcome = BatchWriteOutcome::default();

    for pending in batch {
        let Some(mut entry) = store.find(pending.id)?.filter(Entry::is_active) else {
            debug!(
                "event=autosave_write module=autosave status=missing entry_id={}",
                pending.id
            );
            outcome.missing.push(pending.id);
            continue;
        };

        let mut content_changed = false;
        for change in &pending.changes {
            match change.apply_to(&mut entry) {
                Ok(()) => content_changed |= change.key() == FieldKey::Content,
                Err(err) => warn!(
                    "event=autosave_write module=autosave status=skipped_field entry_id={} field={} error={}",
                    pending.id,
                    change.key(),
                    err
                ),
            }
        }
        if content_changed {
            refresh_preview(&mut entry);
        }
        entry.updated_at = modified_at.max(entry.created_at);

        store.stage(&entry)?;
        outcome.committed.push(pending.id);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::write_batch;
    use crate::autosave::buffer::PendingEntry;
    use crate::model::entry::{Entry, EntryKind};
    use crate::model::field::FieldChange;
    use crate::repo::entry_repo::{EntryRepository, SqliteEntryRepository};
    use crate::store::{EntryStore, SqliteEntryStore};
    use uuid::Uuid;

    fn seeded_store(entries: &[Entry]) -> SqliteEntryStore {
        let store = SqliteEntryStore::open_in_memory().expect("open in-memory store");
        let repo = SqliteEntryRepository::new(store.connection());
        for entry in entries {
            repo.create_entry(entry).expect("create entry");
        }
        store
    }

    fn load(store: &SqliteEntryStore, id: Uuid) -> Entry {
        SqliteEntryRepository::new(store.connection())
            .get_entry(id, false)
            .expect("get entry")
            .expect("entry exists")
    }

    #[test]
    fn writes_fields_timestamp_and_preview() {
        let note = Entry::new(EntryKind::Note, "t", "");
        let mut store = seeded_store(&[note.clone()]);
        let modified_at = note.created_at + 5_000;

        let outcome = write_batch(
            &mut store,
            &[PendingEntry {
                id: note.uuid,
                changes: vec![
                    FieldChange::Title("Hi there".to_string()),
                    FieldChange::Content("**bold** body".to_string()),
                ],
            }],
            modified_at,
        )
        .expect("write batch");

        assert_eq!(outcome.committed, vec![note.uuid]);
        let loaded = load(&store, note.uuid);
        assert_eq!(loaded.title, "Hi there");
        assert_eq!(loaded.preview_text.as_deref(), Some("bold body"));
        assert_eq!(loaded.updated_at, modified_at);
    }

    #[test]
    fn missing_and_deleted_entries_are_reported_missing() {
        let deleted = Entry::new(EntryKind::Journal, "gone", "");
        let mut store = seeded_store(&[deleted.clone()]);
        SqliteEntryRepository::new(store.connection())
            .soft_delete_entry(deleted.uuid)
            .expect("soft delete entry");
        let unknown = Uuid::new_v4();

        let outcome = write_batch(
            &mut store,
            &[
                PendingEntry {
                    id: deleted.uuid,
                    changes: vec![FieldChange::Pinned(true)],
                },
                PendingEntry {
                    id: unknown,
                    changes: vec![FieldChange::Pinned(true)],
                },
            ],
            deleted.created_at,
        )
        .expect("write batch");

        assert!(outcome.committed.is_empty());
        assert_eq!(outcome.missing, vec![deleted.uuid, unknown]);
    }

    #[test]
    fn inapplicable_field_is_skipped_but_rest_is_written() {
        let note = Entry::new(EntryKind::Note, "t", "");
        let mut store = seeded_store(&[note.clone()]);

        let outcome = write_batch(
            &mut store,
            &[PendingEntry {
                id: note.uuid,
                changes: vec![
                    FieldChange::Favorite(true),
                    FieldChange::Completed(true),
                ],
            }],
            note.created_at,
        )
        .expect("write batch");

        assert_eq!(outcome.committed, vec![note.uuid]);
        let loaded = load(&store, note.uuid);
        assert!(loaded.is_favorite);
        assert!(!loaded.is_completed);
    }

    #[test]
    fn store_is_left_without_open_transaction_after_success() {
        let note = Entry::new(EntryKind::Note, "t", "");
        let mut store = seeded_store(&[note.clone()]);
        write_batch(&mut store, &[], note.created_at).expect("write batch");
        assert!(store.connection().is_autocommit());
        store.begin().expect("begin batch");
        store.rollback();
    }
}
