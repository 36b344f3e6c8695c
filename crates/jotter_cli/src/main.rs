//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `jotter_core` linkage and the auto-save write path end to end.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `jotter_cli [db_path]`. Without a path an in-memory database is used.

use jotter_core::{
    AutoSaveConfig, AutoSaveService, EntryRepository, EntryService, FieldChange,
    SqliteEntryRepository, SqliteEntryStore,
};
use std::error::Error;

const BURST: &[&str] = &["H", "Hi", "Hi ", "Hi t", "Hi th", "Hi the", "Hi ther", "Hi there"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("jotter_core ping={}", jotter_core::ping());
    println!("jotter_core version={}", jotter_core::core_version());

    let store = match std::env::args().nth(1) {
        Some(path) => SqliteEntryStore::open(path)?,
        None => SqliteEntryStore::open_in_memory()?,
    };
    let note_id = EntryService::new(SqliteEntryRepository::new(store.connection()))
        .create_note("", "")?;

    let service = AutoSaveService::start(store, AutoSaveConfig::default())?;
    for title in BURST {
        service.register_change(note_id, FieldChange::Title((*title).to_string()));
    }
    println!("autosave pending={}", service.pending_changes_count());

    let outcome = service.force_save().await?;
    let saved = service.with_store(|store| {
        SqliteEntryRepository::new(store.connection()).get_entry(note_id, false)
    })?;
    println!(
        "autosave committed={} status={} title={:?}",
        outcome.committed.len(),
        service.status().as_str(),
        saved.map(|entry| entry.title).unwrap_or_default()
    );

    service.shutdown().await?;
    Ok(())
}
