//! End-to-end behaviour of several apps sharing one store and one bus.

use std::sync::Arc;
use std::time::Duration;

use shared::sync::{ManualClock, MigrationOutcome, SpaceBus, SpaceStore, SpaceSync, SyncOptions, Verdict};
use shared::types::{SpaceId, SpaceSyncMessage, UNIFIED_STORAGE_KEY};
use tokio::sync::mpsc;

fn app(
    id: &str,
    store: &SpaceStore,
    bus: &Arc<SpaceBus>,
    clock: &Arc<ManualClock>,
) -> SpaceSync {
    SpaceSync::with_clock(
        SyncOptions::new(id),
        Some(store.clone()),
        Some(Arc::clone(bus)),
        clock.clone(),
    )
}

async fn listen(sync: &mut SpaceSync) -> mpsc::UnboundedReceiver<SpaceId> {
    let (tx, rx) = mpsc::unbounded_channel();
    assert!(
        sync.subscribe(move |space| {
            let _ = tx.send(space.clone());
        })
        .await
    );
    rx
}

async fn expect_none(rx: &mut mpsc::UnboundedReceiver<SpaceId>) {
    assert!(
        tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .is_err(),
        "callback fired unexpectedly"
    );
}

fn family() -> SpaceId {
    SpaceId::Space("family-1".to_string())
}

#[tokio::test]
async fn broadcast_reaches_other_app_but_not_itself() {
    let store = SpaceStore::in_memory();
    let bus = Arc::new(SpaceBus::new());
    let clock = Arc::new(ManualClock::new(1_000));

    let mut notes = app("notes", &store, &bus, &clock);
    let mut todo = app("todo", &store, &bus, &clock);
    let mut notes_rx = listen(&mut notes).await;
    let mut todo_rx = listen(&mut todo).await;

    let delivered = notes.broadcast(family()).await.unwrap();
    assert_eq!(delivered, 2);

    let applied = tokio::time::timeout(Duration::from_secs(1), todo_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(applied, family());
    assert_eq!(todo.current_space().await, Some(family()));
    expect_none(&mut notes_rx).await;

    notes.teardown().await;
    todo.teardown().await;
}

#[tokio::test]
async fn broadcast_writes_store_before_posting() {
    let store = SpaceStore::in_memory();
    let bus = Arc::new(SpaceBus::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let notes = app("notes", &store, &bus, &clock);

    // A bare receiver checks the slot the moment the message arrives.
    let mut raw = bus.open(shared::types::SYNC_CHANNEL_NAME).await;
    notes.broadcast(family()).await.unwrap();
    let msg = raw.recv().await.unwrap();

    assert_eq!(msg.timestamp, 1_000);
    assert_eq!(
        store.get(UNIFIED_STORAGE_KEY).await.as_deref(),
        Some("family-1")
    );
}

#[tokio::test]
async fn echo_of_own_last_broadcast_is_stale_even_from_another_app_id() {
    let store = SpaceStore::in_memory();
    let bus = Arc::new(SpaceBus::new());
    let clock = Arc::new(ManualClock::new(5_000));
    let notes = app("notes", &store, &bus, &clock);

    notes.broadcast(SpaceId::Personal).await.unwrap();

    let replay = SpaceSyncMessage::space_changed(family(), "todo", 5_000);
    assert_eq!(notes.handle_message(replay).await, Verdict::Stale);
    let older = SpaceSyncMessage::space_changed(family(), "todo", 4_000);
    assert_eq!(notes.handle_message(older).await, Verdict::Stale);
    assert_eq!(notes.current_space().await, Some(SpaceId::Personal));
}

#[tokio::test]
async fn rapid_messages_apply_at_most_once() {
    let store = SpaceStore::in_memory();
    let bus = Arc::new(SpaceBus::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut todo = app("todo", &store, &bus, &clock);
    let mut rx = listen(&mut todo).await;

    let first = SpaceSyncMessage::space_changed(family(), "notes", 10_000);
    let second = SpaceSyncMessage::space_changed(SpaceId::All, "calendar", 10_040);
    assert_eq!(todo.handle_message(first).await, Verdict::Applied);
    assert_eq!(todo.handle_message(second).await, Verdict::Debounced);

    assert_eq!(rx.recv().await, Some(family()));
    expect_none(&mut rx).await;
}

#[tokio::test]
async fn migration_copies_legacy_value_once() {
    let store = SpaceStore::in_memory();
    store.set("notes-current-space", "family-1").await.unwrap();

    let notes = SpaceSync::new(
        SyncOptions::new("notes").with_legacy_key("notes-current-space"),
        Some(store.clone()),
        None,
    );

    assert_eq!(notes.initialize().await.unwrap(), MigrationOutcome::Migrated);
    assert_eq!(
        store.get(UNIFIED_STORAGE_KEY).await.as_deref(),
        Some("family-1")
    );
    assert_eq!(notes.current_space().await, Some(family()));

    // Legacy slot stays for apps that still read it.
    assert_eq!(
        store.get("notes-current-space").await.as_deref(),
        Some("family-1")
    );

    store.set("notes-current-space", "work").await.unwrap();
    assert_eq!(notes.initialize().await.unwrap(), MigrationOutcome::AlreadyPresent);
    assert_eq!(
        store.get(UNIFIED_STORAGE_KEY).await.as_deref(),
        Some("family-1")
    );
}

#[tokio::test]
async fn migration_never_overwrites_unified_value() {
    let store = SpaceStore::in_memory();
    store.set(UNIFIED_STORAGE_KEY, "all").await.unwrap();
    store.set("todo-current-space", "family-1").await.unwrap();

    let todo = SpaceSync::new(
        SyncOptions::new("todo").with_legacy_key("todo-current-space"),
        Some(store.clone()),
        None,
    );

    assert_eq!(todo.initialize().await.unwrap(), MigrationOutcome::AlreadyPresent);
    assert_eq!(store.get(UNIFIED_STORAGE_KEY).await.as_deref(), Some("all"));
    assert_eq!(todo.current_space().await, Some(SpaceId::All));
}

#[tokio::test]
async fn migration_outcomes_without_legacy_data() {
    let store = SpaceStore::in_memory();

    let plain = SpaceSync::new(SyncOptions::new("habits"), Some(store.clone()), None);
    assert_eq!(plain.initialize().await.unwrap(), MigrationOutcome::NotConfigured);

    let empty = SpaceSync::new(
        SyncOptions::new("fitness").with_legacy_key("fitness-space"),
        Some(store.clone()),
        None,
    );
    assert_eq!(empty.initialize().await.unwrap(), MigrationOutcome::NoLegacyValue);

    store.set("journal-space", "  ").await.unwrap();
    let blank = SpaceSync::new(
        SyncOptions::new("journal").with_legacy_key("journal-space"),
        Some(store.clone()),
        None,
    );
    assert_eq!(blank.initialize().await.unwrap(), MigrationOutcome::NoLegacyValue);
    assert_eq!(store.get(UNIFIED_STORAGE_KEY).await, None);
}

#[tokio::test]
async fn teardown_stops_applying_changes() {
    let store = SpaceStore::in_memory();
    let bus = Arc::new(SpaceBus::new());
    let clock = Arc::new(ManualClock::new(1_000));

    let notes = app("notes", &store, &bus, &clock);
    let mut todo = app("todo", &store, &bus, &clock);
    let mut rx = listen(&mut todo).await;
    assert!(todo.is_listening());

    todo.teardown().await;
    assert!(!todo.is_listening());
    assert_eq!(bus.channel_count().await, 0);

    assert_eq!(notes.broadcast(family()).await.unwrap(), 0);
    expect_none(&mut rx).await;
}

#[tokio::test]
async fn change_is_visible_through_store_subscription() {
    let store = SpaceStore::in_memory();
    let bus = Arc::new(SpaceBus::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let notes = app("notes", &store, &bus, &clock);
    let mut changes = store.subscribe();

    notes.broadcast(SpaceId::All).await.unwrap();

    let event = changes.recv().await.unwrap();
    assert_eq!(event.key, UNIFIED_STORAGE_KEY);
    assert_eq!(event.new_value.as_deref(), Some("all"));
}
