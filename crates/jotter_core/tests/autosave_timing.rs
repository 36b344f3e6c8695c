mod common;

use common::{manual_config, MemoryStore};
use jotter_core::{
    AutoSaveConfig, AutoSaveService, Entry, EntryKind, FieldChange, FlushReport, SaveStatus,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

async fn wait_until_saved(service: &AutoSaveService<MemoryStore>) {
    let mut status = service.subscribe();
    status
        .wait_for(|status| matches!(status, SaveStatus::Saved { .. }))
        .await
        .expect("status channel open");
}

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_a_burst_into_one_write() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let config = AutoSaveConfig {
        periodic_flush_ms: 60_000,
        ..AutoSaveConfig::default()
    };
    let service = AutoSaveService::start(store.clone(), config).expect("start auto-save");

    service.register_change(id, FieldChange::Title("draft".to_string()));
    sleep(Duration::from_millis(200)).await;
    service.register_change(id, FieldChange::Content("# body".to_string()));
    sleep(Duration::from_millis(200)).await;
    service.register_change(id, FieldChange::Pinned(true));

    sleep(Duration::from_millis(400)).await;
    assert_eq!(store.commits(), 0);
    assert_eq!(service.status(), SaveStatus::Idle);

    wait_until_saved(&service).await;
    assert_eq!(store.batch_sizes(), vec![1]);
    let saved = store.get(id).expect("entry exists");
    assert_eq!(saved.title, "draft");
    assert_eq!(saved.content, "# body");
    assert!(saved.is_pinned);
    assert_eq!(service.pending_changes_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn force_save_disarms_pending_debounce() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let config = AutoSaveConfig {
        periodic_flush_ms: 60_000,
        ..AutoSaveConfig::default()
    };
    let service = AutoSaveService::start(store.clone(), config).expect("start auto-save");

    service.register_change(id, FieldChange::Title("typed".to_string()));
    assert!(service.is_debounce_armed());

    let outcome = service.force_save().await.expect("force save");
    assert_eq!(outcome.committed, vec![id]);
    assert!(!service.is_debounce_armed());

    let mut status = service.subscribe();
    status.borrow_and_update();
    sleep(service.config().debounce() * 4).await;

    assert!(!service.is_debounce_armed());
    assert!(!status.has_changed().expect("status channel open"));
    assert_eq!(store.commits(), 1);
}

#[tokio::test(start_paused = true)]
async fn periodic_flush_bounds_latency_under_continuous_typing() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let service = AutoSaveService::start(store.clone(), AutoSaveConfig::default()).expect("start auto-save");

    // One keystroke every 300ms keeps restarting the 500ms debounce.
    for idx in 0..10 {
        service.register_change(id, FieldChange::Content(format!("typing {idx}")));
        sleep(Duration::from_millis(300)).await;
    }

    assert!(store.commits() >= 1);
    assert!(store.get(id).expect("entry exists").content.starts_with("typing "));
}

#[tokio::test(start_paused = true)]
async fn memory_pressure_flushes_without_waiting_for_debounce() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let service = AutoSaveService::start(store.clone(), AutoSaveConfig::default()).expect("start auto-save");
    service.register_change(id, FieldChange::Favorite(true));

    let started = Instant::now();
    service.handle_memory_pressure();
    wait_until_saved(&service).await;

    assert!(started.elapsed() < service.config().debounce());
    assert!(store.get(id).expect("entry exists").is_favorite);
    assert_eq!(store.commits(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_error_returns_to_idle() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let service = AutoSaveService::start(store.clone(), manual_config()).expect("start auto-save");
    service.register_change(id, FieldChange::Title("x".to_string()));

    store.fail_commits(Some(true));
    assert!(matches!(
        service.flush_now().await,
        FlushReport::Failed { .. }
    ));
    assert!(matches!(
        service.status(),
        SaveStatus::Error {
            critical: false,
            ..
        }
    ));
    assert_eq!(service.status().display_color().as_str(), "red");

    sleep(Duration::from_millis(2_900)).await;
    assert!(matches!(service.status(), SaveStatus::Error { .. }));
    sleep(Duration::from_millis(200)).await;
    assert_eq!(service.status(), SaveStatus::Idle);
    assert!(service.has_pending_changes(id));
}

#[tokio::test(start_paused = true)]
async fn critical_error_stays_visible() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let service = AutoSaveService::start(store.clone(), manual_config()).expect("start auto-save");
    service.register_change(id, FieldChange::Title("x".to_string()));

    store.fail_commits(Some(false));
    service.flush_now().await;
    sleep(Duration::from_millis(10_000)).await;
    assert!(matches!(
        service.status(),
        SaveStatus::Error { critical: true, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn error_clear_does_not_override_later_success() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let service = AutoSaveService::start(store.clone(), manual_config()).expect("start auto-save");
    service.register_change(id, FieldChange::Title("x".to_string()));

    store.fail_commits(Some(true));
    service.flush_now().await;
    store.fail_commits(None);
    sleep(Duration::from_millis(1_000)).await;
    assert!(matches!(service.flush_now().await, FlushReport::Written(_)));

    sleep(Duration::from_millis(5_000)).await;
    assert!(matches!(service.status(), SaveStatus::Saved { .. }));
}

#[tokio::test(start_paused = true)]
async fn timers_stop_after_last_handle_drops() {
    let store = MemoryStore::new();
    let id = store.insert(Entry::new(EntryKind::Note, "", ""));
    let service = AutoSaveService::start(store.clone(), AutoSaveConfig::default()).expect("start auto-save");
    service.register_change(id, FieldChange::Title("lost".to_string()));
    drop(service);

    sleep(Duration::from_millis(10_000)).await;
    assert_eq!(store.commits(), 0);
}
