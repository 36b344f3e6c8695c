//! Entry use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/delete entry points for core callers.
//! - Derive the markdown preview projection (`preview_text`).
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - `preview_text` is recomputed whenever content is written.

use crate::model::entry::{Entry, EntryId, EntryKind};
use crate::repo::entry_repo::{EntryListQuery, EntryRepository, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;

const PREVIEW_MAX_CHARS: usize = 100;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Use-case service wrapper for entry CRUD operations.
pub struct EntryService<R: EntryRepository> {
    repo: R,
}

impl<R: EntryRepository> EntryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a note from a title and markdown body.
    pub fn create_note(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> RepoResult<EntryId> {
        self.create(Entry::new(EntryKind::Note, title, content))
    }

    /// Creates a journal entry.
    pub fn create_journal(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> RepoResult<EntryId> {
        self.create(Entry::new(EntryKind::Journal, title, content))
    }

    /// Creates an open task with an optional due date (epoch ms).
    pub fn create_task(&self, title: impl Into<String>, due_at: Option<i64>) -> RepoResult<EntryId> {
        let mut entry = Entry::new(EntryKind::Task, title, "");
        entry.due_at = due_at;
        self.create(entry)
    }

    pub fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        self.repo.get_entry(id, false)
    }

    pub fn list_entries(&self, query: &EntryListQuery) -> RepoResult<Vec<Entry>> {
        self.repo.list_entries(query)
    }

    /// Tombstones one entry. Pending auto-save edits for it become moot.
    pub fn delete_entry(&self, id: EntryId) -> RepoResult<()> {
        self.repo.soft_delete_entry(id)
    }

    fn create(&self, mut entry: Entry) -> RepoResult<EntryId> {
        refresh_preview(&mut entry);
        self.repo.create_entry(&entry)
    }
}

/// Recomputes `preview_text` from the entry's current content.
pub fn refresh_preview(entry: &mut Entry) {
    entry.preview_text = derive_markdown_preview(entry.content.as_str());
}

/// Derives a plain-text preview from markdown content.
///
/// Rules:
/// - images are removed, links keep their label;
/// - markdown symbols are removed and whitespace is collapsed;
/// - the first 100 chars are retained, empty results map to `None`.
pub fn derive_markdown_preview(content: &str) -> Option<String> {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    }
}
