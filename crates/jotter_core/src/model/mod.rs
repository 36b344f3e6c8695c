//! Domain model for note/journal/task entries and their buffered edits.
//!
//! # Responsibility
//! - Define canonical data structures used by storage and auto-save.
//! - Keep a single entry-centric shape for multiple UI projections.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod entry;
pub mod field;
