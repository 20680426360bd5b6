use std::time::Duration;

use pill_alarm::{Medicine, MedicineDb, MedicineListState, MedicineRepository, Schedule};

const WAIT: Duration = Duration::from_secs(5);

/// Helper to build a list state over a fresh in-memory store
async fn create_state(grace: Duration) -> (MedicineListState, MedicineDb) {
    let db = MedicineDb::open_in_memory().await.unwrap();
    let state = MedicineListState::with_grace(MedicineRepository::new(db.clone()), grace);
    (state, db)
}

fn aspirin() -> Medicine {
    Medicine::new("Aspirin", "Take with food").with_schedule(Schedule::new("08:00 AM", [1, 3, 5]).unwrap())
}

#[tokio::test]
async fn test_observer_starts_with_empty_list() {
    let db = MedicineDb::open_in_memory().await.unwrap();
    db.insert(&aspirin()).await.unwrap();
    let state = MedicineListState::new(MedicineRepository::new(db));

    assert!(state.current().is_empty());
    let mut observer = state.observe();
    // Nothing has run yet on this single-threaded runtime
    assert!(observer.current().is_empty());

    let list = tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list[0].name, "Aspirin");
    assert_eq!(state.current(), list);
}

#[tokio::test]
async fn test_add_medicine_shows_up_in_observer() {
    let (state, _db) = create_state(Duration::from_millis(50)).await;
    let mut observer = state.observe();

    let handle = state.add_medicine(aspirin());
    let id = handle.await.unwrap().unwrap();
    assert!(id > 0);

    let list = tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list[0], Medicine { id, ..aspirin() });
}

#[tokio::test]
async fn test_delete_medicine_removes_from_observer() {
    let (state, db) = create_state(Duration::from_millis(50)).await;
    let first = db.insert(&aspirin()).await.unwrap();
    let second = db.insert(&Medicine::new("Ibuprofen", "")).await.unwrap();
    let mut observer = state.observe();
    tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 2))
        .await
        .unwrap()
        .unwrap();

    let removed = state
        .delete_medicine(Medicine { id: first, ..aspirin() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed, 1);

    let list = tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list[0].id, second);
}

#[tokio::test]
async fn test_fire_and_forget_writes() {
    let (state, _db) = create_state(Duration::from_millis(50)).await;
    let mut observer = state.observe();

    // Handles deliberately dropped
    drop(state.add_medicine(aspirin()));
    drop(state.add_medicine(Medicine::new("Ibuprofen", "")));

    let list = tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 2))
        .await
        .unwrap()
        .unwrap();
    assert!(list.iter().all(|m| m.id > 0));
}

#[tokio::test]
async fn test_subscription_stops_after_grace_period() {
    let (state, _db) = create_state(Duration::from_millis(50)).await;
    assert!(!state.is_subscribed());

    let observer = state.observe();
    assert!(state.is_subscribed());
    drop(observer);

    // Still alive inside the grace period
    assert!(state.is_subscribed());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!state.is_subscribed());
}

#[tokio::test]
async fn test_reobserve_within_grace_keeps_subscription() {
    let (state, _db) = create_state(Duration::from_millis(200)).await;

    drop(state.observe());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let _observer = state.observe();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(state.is_subscribed());
}

#[tokio::test]
async fn test_subscription_survives_while_any_observer_remains() {
    let (state, _db) = create_state(Duration::from_millis(20)).await;
    let first = state.observe();
    let _second = state.observe();
    drop(first);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(state.is_subscribed());
}

#[tokio::test]
async fn test_last_snapshot_kept_after_teardown_and_refreshed_on_restart() {
    let (state, db) = create_state(Duration::from_millis(20)).await;
    {
        let mut observer = state.observe();
        db.insert(&aspirin()).await.unwrap();
        tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 1))
            .await
            .unwrap()
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!state.is_subscribed());

    // Written while nobody was subscribed
    db.insert(&Medicine::new("Ibuprofen", "")).await.unwrap();
    assert_eq!(state.current().len(), 1);

    let mut observer = state.observe();
    assert_eq!(observer.current().len(), 1);
    tokio::time::timeout(WAIT, observer.wait_for(|l| l.len() == 2))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_changed_delivers_each_refresh() {
    let (state, db) = create_state(Duration::from_millis(50)).await;
    let mut observer = state.observe();

    let first = tokio::time::timeout(WAIT, observer.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(first.is_empty());

    db.insert(&aspirin()).await.unwrap();
    let second = tokio::time::timeout(WAIT, observer.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.len(), 1);
}

#[tokio::test]
async fn test_dropping_state_closes_observers() {
    let (state, db) = create_state(Duration::from_millis(50)).await;
    let mut observer = state.observe();
    tokio::time::timeout(WAIT, observer.wait_for(|l| l.is_empty()))
        .await
        .unwrap()
        .unwrap();

    drop(state);
    db.insert(&aspirin()).await.unwrap();

    // Never satisfied, so this only returns once the channel is closed
    let result = tokio::time::timeout(WAIT, observer.wait_for(|_| false))
        .await
        .expect("observer hung after the list state was dropped");
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_first_snapshot_reaches_observer_on_multi_thread_runtime() {
    let (state, db) = create_state(Duration::from_millis(50)).await;
    db.insert(&aspirin()).await.unwrap();

    let mut observer = state.observe();
    let first = tokio::time::timeout(WAIT, observer.changed())
        .await
        .expect("first snapshot was skipped")
        .unwrap();
    assert_eq!(first.len(), 1);
}
