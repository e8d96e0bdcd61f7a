use std::time::Duration;

use super::*;
use crate::{catalog::Catalog, reorder::DragGesture, Planner};
use shared::domain::EventId;
use storage::{MemoryStore, Storage};

fn catalog_events() -> Vec<Event> {
    Catalog::builtin().events().to_vec()
}

async fn round_trip(events: Vec<Event>) -> Itinerary {
    let adapter = PersistenceAdapter::new(Arc::new(MemoryStore::new()));
    adapter.save(&events).await.expect("save");
    adapter.load().await
}

#[tokio::test]
async fn missing_key_loads_empty() {
    let adapter = PersistenceAdapter::new(Arc::new(MemoryStore::new()));
    assert!(adapter.load().await.is_empty());
}

#[tokio::test]
async fn invalid_json_loads_empty() {
    let store = MemoryStore::with_entry(ITINERARY_STORAGE_KEY, b"{not json".to_vec()).await;
    let adapter = PersistenceAdapter::new(Arc::new(store));
    assert!(adapter.load().await.is_empty());
}

#[tokio::test]
async fn wrong_shape_loads_empty() {
    let store = MemoryStore::with_entry(ITINERARY_STORAGE_KEY, br#"{"id": 1}"#.to_vec()).await;
    let adapter = PersistenceAdapter::new(Arc::new(store));
    assert!(adapter.load().await.is_empty());
}

#[tokio::test]
async fn round_trips_empty_single_and_reordered_lists() {
    assert!(round_trip(Vec::new()).await.is_empty());

    let single = vec![catalog_events()[0].clone()];
    assert_eq!(round_trip(single.clone()).await.events(), single.as_slice());

    let mut reordered = catalog_events();
    reordered.reverse();
    assert_eq!(round_trip(reordered.clone()).await.events(), reordered.as_slice());
}

#[tokio::test]
async fn persisted_layout_uses_catalog_field_names() {
    let store = Arc::new(MemoryStore::new());
    let adapter = PersistenceAdapter::new(store.clone());
    adapter
        .save(&[Event::new(2, "Engineering Expo", 38.5405, -121.7496)])
        .await
        .expect("save");

    let raw = store
        .get(ITINERARY_STORAGE_KEY)
        .await
        .expect("get")
        .expect("value");
    assert_eq!(
        String::from_utf8(raw).expect("utf8"),
        r#"[{"id":2,"name":"Engineering Expo","lat":38.5405,"lng":-121.7496}]"#
    );
}

#[tokio::test]
async fn duplicate_entries_on_disk_are_collapsed() {
    let event = catalog_events()[0].clone();
    let restored = round_trip(vec![event.clone(), event]).await;
    assert_eq!(restored.len(), 1);
}

#[tokio::test]
async fn clear_removes_the_key() {
    let adapter = PersistenceAdapter::new(Arc::new(MemoryStore::new()));
    adapter.save(&catalog_events()).await.expect("save");
    assert!(adapter.clear().await.expect("clear"));
    assert!(adapter.load().await.is_empty());
    assert!(!adapter.clear().await.expect("clear again"));
}

#[tokio::test]
async fn mirror_writes_only_real_changes() {
    let store = Arc::new(MemoryStore::new());
    let adapter = PersistenceAdapter::new(store.clone());
    let mut planner = Planner::new(Arc::new(Catalog::builtin()));
    let mirror = adapter.spawn_mirror(planner.subscribe_events());

    planner.restore(Itinerary::new());
    planner.add_by_id(EventId(2)).expect("known id");
    planner.add_by_id(EventId(4)).expect("known id");
    planner.add_by_id(EventId(2)).expect("known id");
    planner.reorder(1, 1).expect("in range");
    planner.apply_gesture(DragGesture {
        active: EventId(2),
        over: Some(EventId(2)),
    });
    planner.reorder(0, 1).expect("in range");
    drop(planner);

    let writes = tokio::time::timeout(Duration::from_secs(5), mirror)
        .await
        .expect("mirror finished")
        .expect("join");
    assert_eq!(writes, 3);
    assert_eq!(store.write_count(), 3);

    let restored = adapter.load().await;
    assert_eq!(restored.ids(), vec![EventId(4), EventId(2)]);
}

#[tokio::test]
async fn sqlite_backend_survives_reopen() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("picnic_planner_persistence_test_{suffix}"));
    let url = format!("sqlite://{}?mode=rwc", root.join("planner.db").display());

    {
        let storage = Storage::new(&url).await.expect("open");
        let adapter = PersistenceAdapter::new(Arc::new(storage));
        adapter.save(&catalog_events()[..2]).await.expect("save");
    }

    let storage = Storage::new(&url).await.expect("reopen");
    let adapter = PersistenceAdapter::new(Arc::new(storage));
    assert_eq!(adapter.load().await.ids(), vec![EventId(1), EventId(2)]);

    let _ = std::fs::remove_dir_all(root);
}
