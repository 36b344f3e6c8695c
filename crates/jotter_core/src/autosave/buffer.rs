//! Pending-change buffer.
//!
//! # Responsibility
//! - Accumulate field edits per entry with last-write-wins per field.
//! - Bound memory by evicting the oldest-inserted entries on overflow.
//! - Hand out bounded snapshots for the batch writer and acknowledge them
//!   after a successful commit.
//!
//! # Invariants
//! - Every buffered entry id holds at least one pending field.
//! - Iteration order is insertion order of the entry id; re-editing an
//!   entry does not move it.
//! - Overflow eviction silently drops the evicted entries' unsaved edits.
//!   This is the bounded-memory policy, callers must not rely on edits
//!   outliving `max_entries` newer entries.

use crate::model::entry::EntryId;
use crate::model::field::{FieldChange, FieldKey};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Edits for one entry captured at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: EntryId,
    pub changes: Vec<FieldChange>,
}

/// Insertion-ordered map of entry id to pending field edits.
#[derive(Debug)]
pub struct PendingChanges {
    entries: IndexMap<EntryId, BTreeMap<FieldKey, FieldChange>>,
    max_entries: usize,
    eviction_margin: usize,
}

impl PendingChanges {
    /// `eviction_margin` is clamped below `max_entries`.
    pub fn new(max_entries: usize, eviction_margin: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: IndexMap::new(),
            max_entries,
            eviction_margin: eviction_margin.min(max_entries - 1),
        }
    }

    /// Merges `changes` into the entry's pending set.
    ///
    /// Returns the number of entries evicted to make room. An empty
    /// `changes` iterator leaves the buffer untouched.
    pub fn register<I>(&mut self, id: EntryId, changes: I) -> usize
    where
        I: IntoIterator<Item = FieldChange>,
    {
        let mut changes = changes.into_iter().peekable();
        if changes.peek().is_none() {
            return 0;
        }

        let mut evicted = 0;
        if !self.entries.contains_key(&id) && self.entries.len() >= self.max_entries {
            let target = self.max_entries - self.eviction_margin - 1;
            evicted = self.entries.len() - target;
            self.entries.drain(..evicted);
        }

        let fields = self.entries.entry(id).or_default();
        for change in changes {
            fields.insert(change.key(), change);
        }
        evicted
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of distinct entries with pending edits.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending edits for one entry, ordered by field key.
    pub fn changes_for(&self, id: EntryId) -> Vec<FieldChange> {
        self.entries
            .get(&id)
            .map(|fields| fields.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops all pending edits for one entry. Returns whether any existed.
    pub fn remove(&mut self, id: EntryId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    /// Drops everything. Returns the number of entries discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.entries.len();
        self.entries.clear();
        discarded
    }

    /// Clones the first `limit` entries in buffer order.
    pub fn snapshot(&self, limit: usize) -> Vec<PendingEntry> {
        self.entries
            .iter()
            .take(limit)
            .map(|(id, fields)| PendingEntry {
                id: *id,
                changes: fields.values().cloned().collect(),
            })
            .collect()
    }

    /// Removes fields that were durably written.
    ///
    /// A field is only removed while its buffered value still equals the
    /// written one, so edits registered during the write stay pending.
    pub fn acknowledge(&mut self, written: &PendingEntry) {
        let Some(fields) = self.entries.get_mut(&written.id) else {
            return;
        };
        for change in &written.changes {
            let key = change.key();
            if fields.get(&key) == Some(change) {
                fields.remove(&key);
            }
        }
        if fields.is_empty() {
            self.entries.shift_remove(&written.id);
        }
    }
}
