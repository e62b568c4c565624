//! Reservation Engine
//!
//! The only sanctioned ways to change ledger quantities. Every operation is
//! one transaction pairing exactly one version-guarded quantity update with
//! exactly one movement insert; either both commit or neither does. Lost
//! version races retry the whole read-modify-write a bounded number of times
//! before surfacing `ConcurrentModification`.

use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::inventory_item::{self, Entity as InventoryItems};
use crate::entities::inventory_movement::{self, MovementType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::ledger::{self, MovementEntry, QuantityDelta};

/// Attempts per operation before a lost version race is surfaced.
const MAX_WRITE_ATTEMPTS: u32 = 3;

const REFERENCE_TYPE_ORDER: &str = "order";

/// Where returned units come from, for `restock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestockType {
    /// Customer return of previously committed (shipped) stock.
    Return,
    /// Plain replenishment.
    Restock,
}

impl RestockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestockType::Return => "return",
            RestockType::Restock => "restock",
        }
    }
}

/// Updated ledger row and the movement recorded for it.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub item: inventory_item::Model,
    pub movement: inventory_movement::Model,
}

/// Atomic read-modify-write operations over the ledger store.
#[derive(Clone)]
pub struct ReservationEngine {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ReservationEngine {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Manual correction: `available += qty; on_hand += qty` (qty signed).
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        item_id: Uuid,
        quantity: i32,
        reason: &str,
        user_id: Option<Uuid>,
    ) -> Result<OperationResult, ServiceError> {
        if quantity == 0 {
            return Err(ServiceError::ValidationError(
                "Adjustment quantity must not be zero".to_string(),
            ));
        }

        let reason = reason.to_string();
        let result = self
            .execute(item_id, move |item| {
                if quantity < 0 && item.available + quantity < 0 {
                    return Err(ServiceError::InsufficientStock {
                        requested: -quantity,
                        available: item.available,
                    });
                }
                Ok((
                    QuantityDelta {
                        available: quantity,
                        on_hand: quantity,
                        ..Default::default()
                    },
                    MovementEntry {
                        movement_type: MovementType::Adjustment,
                        quantity,
                        reference_type: None,
                        reference_id: None,
                        reason: Some(reason.clone()),
                        user_id,
                    },
                ))
            })
            .await?;

        info!(item_id = %item_id, quantity, "Adjusted stock");
        self.emit(Event::StockAdjusted {
            item_id,
            quantity,
            reason: result
                .movement
                .reason
                .clone()
                .unwrap_or_default(),
            new_available: result.item.available,
        })
        .await;
        self.emit_alert_transitions(&result.item).await;

        Ok(result)
    }

    /// Soft hold pending order confirmation: `available -= qty; reserved += qty`.
    #[instrument(skip(self))]
    pub async fn reserve_stock(
        &self,
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<OperationResult, ServiceError> {
        validate_positive(quantity)?;

        let result = self
            .execute(item_id, move |item| {
                if item.available < quantity {
                    return Err(ServiceError::InsufficientStock {
                        requested: quantity,
                        available: item.available,
                    });
                }
                Ok((
                    QuantityDelta {
                        available: -quantity,
                        reserved: quantity,
                        ..Default::default()
                    },
                    MovementEntry {
                        movement_type: MovementType::Reservation,
                        quantity: -quantity,
                        reference_type: Some(REFERENCE_TYPE_ORDER.to_string()),
                        reference_id: Some(reference_id),
                        reason: None,
                        user_id,
                    },
                ))
            })
            .await?;

        info!(item_id = %item_id, quantity, reference_id = %reference_id, "Reserved stock");
        self.emit(Event::StockReserved {
            item_id,
            quantity,
            reference_id,
            new_available: result.item.available,
        })
        .await;
        self.emit_alert_transitions(&result.item).await;

        Ok(result)
    }

    /// Returns a hold to the free pool: `available += qty; reserved -= qty`.
    #[instrument(skip(self))]
    pub async fn release_reservation(
        &self,
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<OperationResult, ServiceError> {
        validate_positive(quantity)?;

        let result = self
            .execute(item_id, move |item| {
                if item.reserved < quantity {
                    return Err(ServiceError::OverRelease {
                        requested: quantity,
                        reserved: item.reserved,
                    });
                }
                Ok((
                    QuantityDelta {
                        available: quantity,
                        reserved: -quantity,
                        ..Default::default()
                    },
                    MovementEntry {
                        movement_type: MovementType::Release,
                        quantity,
                        reference_type: Some(REFERENCE_TYPE_ORDER.to_string()),
                        reference_id: Some(reference_id),
                        reason: None,
                        user_id,
                    },
                ))
            })
            .await?;

        info!(item_id = %item_id, quantity, reference_id = %reference_id, "Released reservation");
        self.emit(Event::ReservationReleased {
            item_id,
            quantity,
            reference_id,
            new_available: result.item.available,
        })
        .await;

        Ok(result)
    }

    /// Ships reserved stock: `reserved -= qty; on_hand -= qty; committed += qty`.
    ///
    /// `committed` tracks shipped units pending settlement; the units leave
    /// `on_hand` here. Drawing down more than is reserved is an over-release
    /// of the hold.
    #[instrument(skip(self))]
    pub async fn commit_fulfillment(
        &self,
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
    ) -> Result<OperationResult, ServiceError> {
        validate_positive(quantity)?;

        let result = self
            .execute(item_id, move |item| {
                if item.reserved < quantity {
                    return Err(ServiceError::OverRelease {
                        requested: quantity,
                        reserved: item.reserved,
                    });
                }
                Ok((
                    QuantityDelta {
                        reserved: -quantity,
                        committed: quantity,
                        on_hand: -quantity,
                        ..Default::default()
                    },
                    MovementEntry {
                        movement_type: MovementType::Sale,
                        quantity: -quantity,
                        reference_type: Some(REFERENCE_TYPE_ORDER.to_string()),
                        reference_id: Some(reference_id),
                        reason: None,
                        user_id: None,
                    },
                ))
            })
            .await?;

        info!(item_id = %item_id, quantity, reference_id = %reference_id, "Committed fulfillment");
        self.emit(Event::FulfillmentCommitted {
            item_id,
            quantity,
            reference_id,
        })
        .await;

        Ok(result)
    }

    /// Puts units back on the shelf: `available += qty; on_hand += qty`.
    /// A customer return additionally settles up to `qty` committed units.
    #[instrument(skip(self))]
    pub async fn restock(
        &self,
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        restock_type: RestockType,
    ) -> Result<OperationResult, ServiceError> {
        validate_positive(quantity)?;

        let result = self
            .execute(item_id, move |item| {
                let settled = match restock_type {
                    RestockType::Return => item.committed.min(quantity),
                    RestockType::Restock => 0,
                };
                Ok((
                    QuantityDelta {
                        available: quantity,
                        committed: -settled,
                        on_hand: quantity,
                        ..Default::default()
                    },
                    MovementEntry {
                        movement_type: match restock_type {
                            RestockType::Return => MovementType::Return,
                            RestockType::Restock => MovementType::Restock,
                        },
                        quantity,
                        reference_type: Some(REFERENCE_TYPE_ORDER.to_string()),
                        reference_id: Some(reference_id),
                        reason: None,
                        user_id: None,
                    },
                ))
            })
            .await?;

        info!(item_id = %item_id, quantity, reference_id = %reference_id, "Restocked");
        self.emit(Event::StockRestocked {
            item_id,
            quantity,
            reference_id,
            restock_type: restock_type.as_str().to_string(),
        })
        .await;

        Ok(result)
    }

    /// Shared transaction skeleton: read, plan, version-guarded write, audit.
    async fn execute<F>(&self, item_id: Uuid, plan: F) -> Result<OperationResult, ServiceError>
    where
        F: Fn(&inventory_item::Model) -> Result<(QuantityDelta, MovementEntry), ServiceError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

            let item = InventoryItems::find_by_id(item_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Inventory item {} not found", item_id))
                })?;

            let (delta, entry) = match plan(&item) {
                Ok(planned) => planned,
                Err(e) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    return Err(e);
                }
            };

            let updated = match ledger::apply_delta(&txn, &item, &delta).await {
                Ok(updated) => updated,
                Err(ServiceError::ConcurrentModification(id)) if attempts < MAX_WRITE_ATTEMPTS => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    warn!(item_id = %id, attempts, "Version conflict, retrying operation");
                    continue;
                }
                Err(e) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    return Err(e);
                }
            };

            let movement = match ledger::record_movement(&txn, &item, &updated, entry).await {
                Ok(movement) => movement,
                Err(e) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    return Err(e);
                }
            };

            txn.commit().await.map_err(ServiceError::db_error)?;

            return Ok(OperationResult {
                item: updated,
                movement,
            });
        }
    }

    /// Post-commit event emission; failures are logged, never propagated.
    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "Failed to send ledger event");
        }
    }

    async fn emit_alert_transitions(&self, item: &inventory_item::Model) {
        if item.out_of_stock_alert {
            self.emit(Event::OutOfStockDetected {
                item_id: item.id,
                available: item.available,
                threshold: item.out_of_stock_threshold,
            })
            .await;
        } else if item.low_stock_alert {
            self.emit(Event::LowStockDetected {
                item_id: item.id,
                available: item.available,
                threshold: item.low_stock_threshold,
            })
            .await;
        }
    }
}

fn validate_positive(quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn restock_type_strings() {
        assert_eq!(RestockType::Return.as_str(), "return");
        assert_eq!(RestockType::Restock.as_str(), "restock");
    }

    #[rstest]
    #[case(i32::MIN, false)]
    #[case(-3, false)]
    #[case(0, false)]
    #[case(1, true)]
    #[case(250, true)]
    fn only_positive_quantities_are_accepted(#[case] quantity: i32, #[case] accepted: bool) {
        assert_eq!(validate_positive(quantity).is_ok(), accepted);
    }
}
