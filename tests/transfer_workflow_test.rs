mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::TestApp;
use stockledger::entities::inventory_movement::MovementType;
use stockledger::entities::inventory_transfer::TransferStatus;
use stockledger::errors::ServiceError;
use stockledger::entities::location::LocationType;
use stockledger::services::ledger::{MovementFilter, NewLocation};
use stockledger::services::transfer::{NewTransfer, NewTransferLine};

fn transfer_of(
    from: Uuid,
    to: Uuid,
    lines: Vec<NewTransferLine>,
) -> NewTransfer {
    NewTransfer {
        from_location_id: from,
        to_location_id: to,
        lines,
        notes: None,
        created_by: None,
    }
}

#[tokio::test]
async fn creating_a_transfer_debits_every_source_line() {
    let app = TestApp::new().await;
    let from = app
        .state
        .ledger
        .register_location(NewLocation {
            name: "Main warehouse".to_string(),
            location_type: LocationType::Warehouse,
            address: None,
        })
        .await
        .unwrap()
        .id;
    let to = app
        .state
        .ledger
        .register_location(NewLocation {
            name: "Downtown store".to_string(),
            location_type: LocationType::Store,
            address: Some("1 High St".to_string()),
        })
        .await
        .unwrap()
        .id;
    let item_a = app.seed_item_at(10, from).await;
    let item_b = app.seed_item_at(8, from).await;

    let detail = app
        .state
        .transfers
        .create_transfer(transfer_of(
            from,
            to,
            vec![
                NewTransferLine {
                    product_id: item_a.product_id,
                    variant_id: item_a.variant_id,
                    quantity: 4,
                },
                NewTransferLine {
                    product_id: item_b.product_id,
                    variant_id: item_b.variant_id,
                    quantity: 3,
                },
            ],
        ))
        .await
        .unwrap();

    assert_eq!(detail.transfer.status, TransferStatus::Pending.as_str());
    assert!(detail.transfer.transfer_number.starts_with("TR-"));
    assert_eq!(detail.lines.len(), 2);
    assert_eq!(detail.lines[0].sku, item_a.sku);

    let a = app.state.ledger.get_by_id(item_a.id).await.unwrap();
    assert_eq!(a.available, 6);
    assert_eq!(a.on_hand, 6);
    let b = app.state.ledger.get_by_id(item_b.id).await.unwrap();
    assert_eq!(b.available, 5);
    assert_eq!(b.on_hand, 5);

    let (movements, total) = app
        .state
        .ledger
        .list_movements(
            MovementFilter {
                reference_id: Some(detail.transfer.id),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(movements
        .iter()
        .all(|m| m.movement_type == MovementType::TransferOut.as_str()));
}

#[tokio::test]
async fn one_short_line_rolls_back_the_whole_transfer() {
    let app = TestApp::new().await;
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();
    let item_a = app.seed_item_at(10, from).await;
    let item_b = app.seed_item_at(1, from).await;

    let err = app
        .state
        .transfers
        .create_transfer(transfer_of(
            from,
            to,
            vec![
                NewTransferLine {
                    product_id: item_a.product_id,
                    variant_id: item_a.variant_id,
                    quantity: 5,
                },
                NewTransferLine {
                    product_id: item_b.product_id,
                    variant_id: item_b.variant_id,
                    quantity: 5,
                },
            ],
        ))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            requested: 5,
            available: 1
        }
    );

    // The first line's debit must have rolled back with the rest.
    let a = app.state.ledger.get_by_id(item_a.id).await.unwrap();
    assert_eq!(a.available, 10);
    assert_eq!(a.version, item_a.version);

    let (transfers, total) = app.state.transfers.list_transfers(1, 50, None).await.unwrap();
    assert_eq!(total, 0);
    assert!(transfers.is_empty());

    let (_, movement_total) = app
        .state
        .ledger
        .list_movements(
            MovementFilter {
                movement_type: Some(MovementType::TransferOut),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(movement_total, 0);
}

#[tokio::test]
async fn completing_a_transfer_credits_the_destination() {
    let app = TestApp::new().await;
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();
    let source = app.seed_item_at(10, from).await;
    // Destination already stocks this variant.
    let destination = app
        .seed_item_full(2, source.product_id, source.variant_id, to)
        .await;

    let detail = app
        .state
        .transfers
        .create_transfer(transfer_of(
            from,
            to,
            vec![NewTransferLine {
                product_id: source.product_id,
                variant_id: source.variant_id,
                quantity: 4,
            }],
        ))
        .await
        .unwrap();

    let in_transit = app
        .state
        .transfers
        .mark_in_transit(detail.transfer.id)
        .await
        .unwrap();
    assert_eq!(in_transit.status, TransferStatus::InTransit.as_str());

    // In transit is bookkeeping only; neither ledger side moves.
    let src = app.state.ledger.get_by_id(source.id).await.unwrap();
    assert_eq!(src.available, 6);
    let dst = app.state.ledger.get_by_id(destination.id).await.unwrap();
    assert_eq!(dst.available, 2);

    let completed = app
        .state
        .transfers
        .complete_transfer(detail.transfer.id)
        .await
        .unwrap();
    assert_eq!(completed.transfer.status, TransferStatus::Completed.as_str());
    assert!(completed.transfer.completed_at.is_some());

    let src = app.state.ledger.get_by_id(source.id).await.unwrap();
    assert_eq!(src.available, 6);
    assert_eq!(src.on_hand, 6);
    let dst = app.state.ledger.get_by_id(destination.id).await.unwrap();
    assert_eq!(dst.available, 6);
    assert_eq!(dst.on_hand, 6);

    let (movements, _) = app
        .state
        .ledger
        .list_movements(
            MovementFilter {
                inventory_item_id: Some(destination.id),
                movement_type: Some(MovementType::TransferIn),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].quantity, 4);
}

#[tokio::test]
async fn completion_provisions_a_missing_destination_row() {
    let app = TestApp::new().await;
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();
    let source = app.seed_item_at(10, from).await;

    let detail = app
        .state
        .transfers
        .create_transfer(transfer_of(
            from,
            to,
            vec![NewTransferLine {
                product_id: source.product_id,
                variant_id: source.variant_id,
                quantity: 4,
            }],
        ))
        .await
        .unwrap();
    app.state
        .transfers
        .mark_in_transit(detail.transfer.id)
        .await
        .unwrap();
    app.state
        .transfers
        .complete_transfer(detail.transfer.id)
        .await
        .unwrap();

    let dst = app
        .state
        .ledger
        .get(source.product_id, source.variant_id, to)
        .await
        .unwrap();
    assert_eq!(dst.available, 4);
    assert_eq!(dst.on_hand, 4);
    assert_eq!(dst.reserved, 0);
    // Sku, cost and thresholds are copied from the source row.
    assert_eq!(dst.sku, source.sku);
    assert_eq!(dst.unit_cost, source.unit_cost);
    assert_eq!(dst.low_stock_threshold, source.low_stock_threshold);
}

#[tokio::test]
async fn cancelling_restores_the_source_ledger() {
    let app = TestApp::new().await;
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();
    let source = app.seed_item_at(10, from).await;

    let detail = app
        .state
        .transfers
        .create_transfer(transfer_of(
            from,
            to,
            vec![NewTransferLine {
                product_id: source.product_id,
                variant_id: source.variant_id,
                quantity: 4,
            }],
        ))
        .await
        .unwrap();

    let cancelled = app
        .state
        .transfers
        .cancel_transfer(detail.transfer.id)
        .await
        .unwrap();
    assert_eq!(cancelled.transfer.status, TransferStatus::Cancelled.as_str());

    let src = app.state.ledger.get_by_id(source.id).await.unwrap();
    assert_eq!(src.available, 10);
    assert_eq!(src.on_hand, 10);

    let (movements, _) = app
        .state
        .ledger
        .list_movements(
            MovementFilter {
                inventory_item_id: Some(source.id),
                movement_type: Some(MovementType::Release),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].reason.as_deref(), Some("transfer cancelled"));
}

#[tokio::test]
async fn status_transitions_are_guarded() {
    let app = TestApp::new().await;
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();
    let source = app.seed_item_at(10, from).await;

    let detail = app
        .state
        .transfers
        .create_transfer(transfer_of(
            from,
            to,
            vec![NewTransferLine {
                product_id: source.product_id,
                variant_id: source.variant_id,
                quantity: 2,
            }],
        ))
        .await
        .unwrap();
    let transfer_id = detail.transfer.id;

    // Cannot complete straight from pending.
    assert_matches!(
        app.state.transfers.complete_transfer(transfer_id).await,
        Err(ServiceError::InvalidOperation(_))
    );

    app.state.transfers.mark_in_transit(transfer_id).await.unwrap();
    // Second dispatch is rejected.
    assert_matches!(
        app.state.transfers.mark_in_transit(transfer_id).await,
        Err(ServiceError::InvalidOperation(_))
    );

    app.state.transfers.complete_transfer(transfer_id).await.unwrap();
    // Terminal states reject both completion and cancellation.
    assert_matches!(
        app.state.transfers.complete_transfer(transfer_id).await,
        Err(ServiceError::InvalidOperation(_))
    );
    assert_matches!(
        app.state.transfers.cancel_transfer(transfer_id).await,
        Err(ServiceError::InvalidOperation(_))
    );

    assert_matches!(
        app.state.transfers.mark_in_transit(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn transfer_creation_validations() {
    let app = TestApp::new().await;
    let location = Uuid::new_v4();
    let item = app.seed_item_at(10, location).await;
    let line = NewTransferLine {
        product_id: item.product_id,
        variant_id: item.variant_id,
        quantity: 1,
    };

    assert_matches!(
        app.state
            .transfers
            .create_transfer(transfer_of(location, location, vec![line.clone()]))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        app.state
            .transfers
            .create_transfer(transfer_of(location, Uuid::new_v4(), vec![]))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        app.state
            .transfers
            .create_transfer(transfer_of(
                location,
                Uuid::new_v4(),
                vec![NewTransferLine {
                    quantity: 0,
                    ..line.clone()
                }]
            ))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    // A line whose triple has no ledger row at the source.
    assert_matches!(
        app.state
            .transfers
            .create_transfer(transfer_of(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![line.clone()]
            ))
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn location_registry_lists_by_name() {
    let app = TestApp::new().await;
    for (name, ty) in [
        ("West DC", LocationType::FulfillmentCenter),
        ("Airport store", LocationType::Store),
    ] {
        app.state
            .ledger
            .register_location(NewLocation {
                name: name.to_string(),
                location_type: ty,
                address: None,
            })
            .await
            .unwrap();
    }

    let locations = app.state.ledger.list_locations(true).await.unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].name, "Airport store");
    assert!(locations.iter().all(|l| l.active));

    assert_matches!(
        app.state
            .ledger
            .register_location(NewLocation {
                name: "  ".to_string(),
                location_type: LocationType::Warehouse,
                address: None,
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn listing_transfers_filters_by_status() {
    let app = TestApp::new().await;
    let from = Uuid::new_v4();
    let to = Uuid::new_v4();
    let item = app.seed_item_at(20, from).await;

    for _ in 0..3 {
        app.state
            .transfers
            .create_transfer(transfer_of(
                from,
                to,
                vec![NewTransferLine {
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity: 2,
                }],
            ))
            .await
            .unwrap();
    }
    let (all, total) = app.state.transfers.list_transfers(1, 50, None).await.unwrap();
    assert_eq!(total, 3);

    app.state.transfers.cancel_transfer(all[0].id).await.unwrap();

    let (pending, pending_total) = app
        .state
        .transfers
        .list_transfers(1, 50, Some(TransferStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending_total, 2);
    assert!(pending
        .iter()
        .all(|t| t.status == TransferStatus::Pending.as_str()));

    assert_matches!(
        app.state.transfers.list_transfers(0, 50, None).await,
        Err(ServiceError::ValidationError(_))
    );
}
