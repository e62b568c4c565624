mod common;

use uuid::Uuid;

use common::TestApp;
use stockledger::errors::ServiceError;
use stockledger::services::ledger::MovementFilter;

// Two orders race for the last units: one wins, one gets a clean
// insufficient-stock error, and the ledger never oversells.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reservations_never_oversell() {
    let app = TestApp::new().await;
    let item = app.seed_item(10).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = app.state.reservations.clone();
        let item_id = item.id;
        handles.push(tokio::spawn(async move {
            engine.reserve_stock(item_id, 6, Uuid::new_v4(), None).await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientStock { .. }) => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(insufficient, 1);

    let stored = app.state.ledger.get_by_id(item.id).await.unwrap();
    assert_eq!(stored.available, 4);
    assert_eq!(stored.reserved, 6);
    assert_eq!(stored.on_hand, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_single_unit_reservations_stop_exactly_at_zero() {
    let app = TestApp::new().await;
    let item = app.seed_item(10).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = app.state.reservations.clone();
        let item_id = item.id;
        handles.push(tokio::spawn(async move {
            engine.reserve_stock(item_id, 1, Uuid::new_v4(), None).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientStock { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 10);

    let stored = app.state.ledger.get_by_id(item.id).await.unwrap();
    assert_eq!(stored.available, 0);
    assert_eq!(stored.reserved, 10);
    assert_eq!(stored.on_hand, 10);

    // One movement per successful reservation, plus the provisioning entry.
    let (_, total) = app
        .state
        .ledger
        .list_movements(
            MovementFilter {
                inventory_item_id: Some(item.id),
                ..Default::default()
            },
            1,
            100,
        )
        .await
        .unwrap();
    assert_eq!(total, 11);
}

// Mixed reads and writes under contention keep the accounting identity
// on_hand == available + reserved.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_reserve_and_release_keep_the_identity() {
    let app = TestApp::new().await;
    let item = app.seed_item(50).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = app.state.reservations.clone();
        let item_id = item.id;
        handles.push(tokio::spawn(async move {
            let order_id = Uuid::new_v4();
            engine.reserve_stock(item_id, 3, order_id, None).await?;
            engine.release_reservation(item_id, 3, order_id, None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = app.state.ledger.get_by_id(item.id).await.unwrap();
    assert_eq!(stored.available, 50);
    assert_eq!(stored.reserved, 0);
    assert_eq!(stored.on_hand, stored.available + stored.reserved);
}
