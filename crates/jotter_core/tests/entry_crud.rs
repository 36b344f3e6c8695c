use jotter_core::db::open_db_in_memory;
use jotter_core::{
    Entry, EntryKind, EntryListQuery, EntryRepository, EntryService, RepoError,
    SqliteEntryRepository,
};
use std::collections::HashSet;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let entry = Entry::new(EntryKind::Note, "first note", "body");
    let id = repo.create_entry(&entry).expect("create entry");

    let loaded = repo.get_entry(id, false).expect("get entry").expect("entry exists");
    assert_eq!(loaded, entry);
}

#[test]
fn update_existing_task() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let mut task = Entry::new(EntryKind::Task, "draft", "");
    repo.create_entry(&task).expect("create entry");

    task.title = "ship release".to_string();
    task.is_completed = true;
    task.due_at = Some(task.created_at + 86_400_000);
    task.updated_at = task.created_at + 5;
    repo.update_entry(&task).expect("update entry");

    let loaded = repo.get_entry(task.uuid, false).expect("get entry").expect("entry exists");
    assert_eq!(loaded.title, "ship release");
    assert!(loaded.is_completed);
    assert_eq!(loaded.due_at, task.due_at);
    assert_eq!(loaded.updated_at, task.created_at + 5);
}

#[test]
fn update_not_found_returns_not_found() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let entry = Entry::new(EntryKind::Note, "missing", "");
    let err = repo.update_entry(&entry).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == entry.uuid));
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let mut invalid = Entry::new(EntryKind::Journal, "day one", "");
    invalid.is_completed = true;
    let create_err = repo.create_entry(&invalid).unwrap_err();
    assert!(matches!(create_err, RepoError::Validation(_)));

    let mut valid = Entry::new(EntryKind::Note, "ok", "");
    repo.create_entry(&valid).expect("create entry");
    valid.updated_at = valid.created_at - 1;
    let update_err = repo.update_entry(&valid).unwrap_err();
    assert!(matches!(update_err, RepoError::Validation(_)));
}

#[test]
fn soft_delete_is_idempotent() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let entry = Entry::new(EntryKind::Journal, "weekly review", "");
    repo.create_entry(&entry).expect("create entry");

    repo.soft_delete_entry(entry.uuid).expect("soft delete entry");
    repo.soft_delete_entry(entry.uuid).expect("soft delete entry");

    assert!(repo.get_entry(entry.uuid, false).expect("get entry").is_none());
    let deleted = repo.get_entry(entry.uuid, true).expect("get entry").expect("entry exists");
    assert!(deleted.is_deleted);
    assert!(deleted.updated_at >= entry.updated_at);
}

#[test]
fn list_orders_by_recency_and_filters_by_kind() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let mut older = Entry::new(EntryKind::Note, "older", "");
    let mut newer = Entry::new(EntryKind::Note, "newer", "");
    let task = Entry::new(EntryKind::Task, "task", "");
    newer.updated_at = older.updated_at + 1_000;
    older.updated_at = older.created_at;
    repo.create_entry(&older).expect("create entry");
    repo.create_entry(&newer).expect("create entry");
    repo.create_entry(&task).expect("create entry");

    let notes = repo
        .list_entries(&EntryListQuery {
            kind: Some(EntryKind::Note),
            ..EntryListQuery::default()
        })
        .expect("list entries");
    let titles: Vec<&str> = notes.iter().map(|entry| entry.title.as_str()).collect();
    assert_eq!(titles, vec!["newer", "older"]);

    let page = repo
        .list_entries(&EntryListQuery {
            kind: Some(EntryKind::Note),
            limit: Some(1),
            offset: 1,
            ..EntryListQuery::default()
        })
        .expect("list entries");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].uuid, older.uuid);
}

#[test]
fn list_excludes_deleted_by_default_and_can_include_them() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);

    let active = Entry::new(EntryKind::Note, "active", "");
    let removed = Entry::new(EntryKind::Task, "deleted later", "");
    repo.create_entry(&active).expect("create entry");
    repo.create_entry(&removed).expect("create entry");
    repo.soft_delete_entry(removed.uuid).expect("soft delete entry");

    let visible = repo.list_entries(&EntryListQuery::default()).expect("list entries");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, active.uuid);

    let all = repo
        .list_entries(&EntryListQuery {
            include_deleted: true,
            ..EntryListQuery::default()
        })
        .expect("list entries");
    assert_eq!(all.len(), 2);
}

#[test]
fn list_default_limit_applies() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let repo = SqliteEntryRepository::new(&conn);
    for idx in 0..25 {
        repo.create_entry(&Entry::new(EntryKind::Note, format!("n{idx}"), ""))
            .expect("create entry");
    }

    assert_eq!(repo.list_entries(&EntryListQuery::default()).expect("list entries").len(), 20);
}

#[test]
fn service_creates_entries_with_previews() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let service = EntryService::new(SqliteEntryRepository::new(&conn));

    let note = service.create_note("plan", "## Goals\n- ship **v1**").expect("create note");
    let journal = service.create_journal("monday", "").expect("create journal");
    let task = service.create_task("call back", Some(1_700_000_000_000)).expect("create task");

    let loaded = service.get_entry(note).expect("get entry").expect("entry exists");
    assert_eq!(loaded.kind, EntryKind::Note);
    assert!(loaded.preview_text.is_some());
    assert_eq!(
        service.get_entry(task).expect("get entry").expect("entry exists").due_at,
        Some(1_700_000_000_000)
    );

    service.delete_entry(journal).expect("delete entry");
    let ids: HashSet<_> = service
        .list_entries(&EntryListQuery::default())
        .expect("list entries")
        .into_iter()
        .map(|entry| entry.uuid)
        .collect();
    assert_eq!(ids, HashSet::from([note, task]));
}
