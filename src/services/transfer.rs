//! Transfer workflow
//!
//! Location-to-location stock moves, run as a saga with transfer-wide status.
//! Creation debits every line at the source in one all-or-nothing transaction;
//! completion credits the destination (auto-provisioning the destination row);
//! cancellation reverses the source debit. Partial per-line fulfillment is not
//! supported.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::inventory_item;
use crate::entities::inventory_movement::MovementType;
use crate::entities::inventory_transfer::{self, Entity as InventoryTransfers, TransferStatus};
use crate::entities::inventory_transfer_line::{self, Entity as InventoryTransferLines};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::ledger::{self, MovementEntry, QuantityDelta};

const MAX_WRITE_ATTEMPTS: u32 = 3;

const REFERENCE_TYPE_TRANSFER: &str = "transfer";

#[derive(Debug, Clone)]
pub struct NewTransferLine {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub lines: Vec<NewTransferLine>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

/// A transfer with its lines, as returned by reads.
#[derive(Debug, Clone)]
pub struct TransferDetail {
    pub transfer: inventory_transfer::Model,
    pub lines: Vec<inventory_transfer_line::Model>,
}

#[derive(Clone)]
pub struct TransferService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a transfer and debits the source ledger for every line.
    ///
    /// All lines succeed or the whole transfer rolls back; a line with
    /// insufficient source stock fails the creation with `InsufficientStock`.
    #[instrument(skip(self, new_transfer))]
    pub async fn create_transfer(
        &self,
        new_transfer: NewTransfer,
    ) -> Result<TransferDetail, ServiceError> {
        if new_transfer.from_location_id == new_transfer.to_location_id {
            return Err(ServiceError::ValidationError(
                "Source and destination locations must differ".to_string(),
            ));
        }
        if new_transfer.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Transfer must have at least one line".to_string(),
            ));
        }
        if new_transfer.lines.iter().any(|l| l.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "Line quantities must be greater than zero".to_string(),
            ));
        }

        let mut attempts = 0;
        let detail = loop {
            attempts += 1;

            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
            match self.try_create(&txn, &new_transfer).await {
                Ok(detail) => {
                    txn.commit().await.map_err(ServiceError::db_error)?;
                    break detail;
                }
                Err(ServiceError::ConcurrentModification(id)) if attempts < MAX_WRITE_ATTEMPTS => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    warn!(item_id = %id, attempts, "Version conflict creating transfer, retrying");
                }
                Err(e) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    return Err(e);
                }
            }
        };

        info!(
            transfer_id = %detail.transfer.id,
            lines = detail.lines.len(),
            "Created transfer"
        );
        self.emit(Event::TransferCreated(detail.transfer.id)).await;

        Ok(detail)
    }

    async fn try_create(
        &self,
        txn: &DatabaseTransaction,
        new_transfer: &NewTransfer,
    ) -> Result<TransferDetail, ServiceError> {
        let transfer_id = Uuid::new_v4();
        let transfer = inventory_transfer::ActiveModel {
            id: Set(transfer_id),
            transfer_number: Set(transfer_number(transfer_id)),
            from_location_id: Set(new_transfer.from_location_id),
            to_location_id: Set(new_transfer.to_location_id),
            status: Set(TransferStatus::Pending.as_str().to_string()),
            notes: Set(new_transfer.notes.clone()),
            created_by: Set(new_transfer.created_by),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            completed_at: Set(None),
        };
        let transfer = transfer.insert(txn).await.map_err(ServiceError::db_error)?;

        let mut lines = Vec::with_capacity(new_transfer.lines.len());
        for line in &new_transfer.lines {
            let source = ledger::find_item(
                txn,
                line.product_id,
                line.variant_id,
                new_transfer.from_location_id,
            )
            .await?;

            if source.available < line.quantity {
                return Err(ServiceError::InsufficientStock {
                    requested: line.quantity,
                    available: source.available,
                });
            }

            let debited = ledger::apply_delta(
                txn,
                &source,
                &QuantityDelta {
                    available: -line.quantity,
                    on_hand: -line.quantity,
                    ..Default::default()
                },
            )
            .await?;

            ledger::record_movement(
                txn,
                &source,
                &debited,
                MovementEntry {
                    movement_type: MovementType::TransferOut,
                    quantity: -line.quantity,
                    reference_type: Some(REFERENCE_TYPE_TRANSFER.to_string()),
                    reference_id: Some(transfer.id),
                    reason: None,
                    user_id: new_transfer.created_by,
                },
            )
            .await?;

            let line_model = inventory_transfer_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                transfer_id: Set(transfer.id),
                product_id: Set(line.product_id),
                variant_id: Set(line.variant_id),
                sku: Set(source.sku.clone()),
                quantity: Set(line.quantity),
            };
            lines.push(line_model.insert(txn).await.map_err(ServiceError::db_error)?);
        }

        Ok(TransferDetail { transfer, lines })
    }

    /// Bookkeeping transition `pending -> in_transit`; no ledger effect.
    #[instrument(skip(self))]
    pub async fn mark_in_transit(
        &self,
        transfer_id: Uuid,
    ) -> Result<inventory_transfer::Model, ServiceError> {
        let rows = InventoryTransfers::update_many()
            .col_expr(
                inventory_transfer::Column::Status,
                Expr::value(TransferStatus::InTransit.as_str()),
            )
            .col_expr(
                inventory_transfer::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(inventory_transfer::Column::Id.eq(transfer_id))
            .filter(inventory_transfer::Column::Status.eq(TransferStatus::Pending.as_str()))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        if rows.rows_affected == 0 {
            let transfer = self.find_transfer(&*self.db, transfer_id).await?;
            return Err(ServiceError::InvalidOperation(format!(
                "Transfer {} is {}, expected pending",
                transfer_id, transfer.status
            )));
        }

        info!(transfer_id = %transfer_id, "Transfer in transit");
        self.emit(Event::TransferInTransit(transfer_id)).await;

        self.find_transfer(&*self.db, transfer_id).await
    }

    /// Credits the destination and finalizes the transfer.
    ///
    /// The destination ledger row is created if absent, copying sku, cost and
    /// thresholds from the source row when it still exists. The source debit
    /// made at creation stands as final.
    #[instrument(skip(self))]
    pub async fn complete_transfer(
        &self,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        let mut attempts = 0;
        let detail = loop {
            attempts += 1;

            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
            match self.try_complete(&txn, transfer_id).await {
                Ok(detail) => {
                    txn.commit().await.map_err(ServiceError::db_error)?;
                    break detail;
                }
                Err(ServiceError::ConcurrentModification(id)) if attempts < MAX_WRITE_ATTEMPTS => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    warn!(item_id = %id, attempts, "Version conflict completing transfer, retrying");
                }
                Err(e) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    return Err(e);
                }
            }
        };

        info!(transfer_id = %transfer_id, "Completed transfer");
        self.emit(Event::TransferCompleted(transfer_id)).await;

        Ok(detail)
    }

    async fn try_complete(
        &self,
        txn: &DatabaseTransaction,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        let now = Utc::now();
        let rows = InventoryTransfers::update_many()
            .col_expr(
                inventory_transfer::Column::Status,
                Expr::value(TransferStatus::Completed.as_str()),
            )
            .col_expr(inventory_transfer::Column::UpdatedAt, Expr::value(Some(now)))
            .col_expr(
                inventory_transfer::Column::CompletedAt,
                Expr::value(Some(now)),
            )
            .filter(inventory_transfer::Column::Id.eq(transfer_id))
            .filter(inventory_transfer::Column::Status.eq(TransferStatus::InTransit.as_str()))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        if rows.rows_affected == 0 {
            let transfer = self.find_transfer(txn, transfer_id).await?;
            return Err(ServiceError::InvalidOperation(format!(
                "Transfer {} is {}, expected in_transit",
                transfer_id, transfer.status
            )));
        }

        let transfer = self.find_transfer(txn, transfer_id).await?;
        let lines = InventoryTransferLines::find()
            .filter(inventory_transfer_line::Column::TransferId.eq(transfer_id))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;

        for line in &lines {
            let destination = match ledger::find_item(
                txn,
                line.product_id,
                line.variant_id,
                transfer.to_location_id,
            )
            .await
            {
                Ok(item) => item,
                Err(ServiceError::NotFound(_)) => {
                    self.create_destination_row(txn, &transfer, line).await?
                }
                Err(e) => return Err(e),
            };

            let credited = ledger::apply_delta(
                txn,
                &destination,
                &QuantityDelta {
                    available: line.quantity,
                    on_hand: line.quantity,
                    ..Default::default()
                },
            )
            .await?;

            ledger::record_movement(
                txn,
                &destination,
                &credited,
                MovementEntry {
                    movement_type: MovementType::TransferIn,
                    quantity: line.quantity,
                    reference_type: Some(REFERENCE_TYPE_TRANSFER.to_string()),
                    reference_id: Some(transfer.id),
                    reason: None,
                    user_id: None,
                },
            )
            .await?;
        }

        Ok(TransferDetail { transfer, lines })
    }

    /// Reverses the source debit and cancels the transfer. Allowed from
    /// `pending` or `in_transit`.
    #[instrument(skip(self))]
    pub async fn cancel_transfer(
        &self,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        let mut attempts = 0;
        let detail = loop {
            attempts += 1;

            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
            match self.try_cancel(&txn, transfer_id).await {
                Ok(detail) => {
                    txn.commit().await.map_err(ServiceError::db_error)?;
                    break detail;
                }
                Err(ServiceError::ConcurrentModification(id)) if attempts < MAX_WRITE_ATTEMPTS => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    warn!(item_id = %id, attempts, "Version conflict cancelling transfer, retrying");
                }
                Err(e) => {
                    txn.rollback().await.map_err(ServiceError::db_error)?;
                    return Err(e);
                }
            }
        };

        info!(transfer_id = %transfer_id, "Cancelled transfer");
        self.emit(Event::TransferCancelled(transfer_id)).await;

        Ok(detail)
    }

    async fn try_cancel(
        &self,
        txn: &DatabaseTransaction,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        let rows = InventoryTransfers::update_many()
            .col_expr(
                inventory_transfer::Column::Status,
                Expr::value(TransferStatus::Cancelled.as_str()),
            )
            .col_expr(
                inventory_transfer::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(inventory_transfer::Column::Id.eq(transfer_id))
            .filter(
                inventory_transfer::Column::Status.is_in([
                    TransferStatus::Pending.as_str(),
                    TransferStatus::InTransit.as_str(),
                ]),
            )
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        if rows.rows_affected == 0 {
            let transfer = self.find_transfer(txn, transfer_id).await?;
            return Err(ServiceError::InvalidOperation(format!(
                "Transfer {} is {}, cannot cancel",
                transfer_id, transfer.status
            )));
        }

        let transfer = self.find_transfer(txn, transfer_id).await?;
        let lines = InventoryTransferLines::find()
            .filter(inventory_transfer_line::Column::TransferId.eq(transfer_id))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;

        for line in &lines {
            let source = ledger::find_item(
                txn,
                line.product_id,
                line.variant_id,
                transfer.from_location_id,
            )
            .await?;

            let restored = ledger::apply_delta(
                txn,
                &source,
                &QuantityDelta {
                    available: line.quantity,
                    on_hand: line.quantity,
                    ..Default::default()
                },
            )
            .await?;

            ledger::record_movement(
                txn,
                &source,
                &restored,
                MovementEntry {
                    movement_type: MovementType::Release,
                    quantity: line.quantity,
                    reference_type: Some(REFERENCE_TYPE_TRANSFER.to_string()),
                    reference_id: Some(transfer.id),
                    reason: Some("transfer cancelled".to_string()),
                    user_id: None,
                },
            )
            .await?;
        }

        Ok(TransferDetail { transfer, lines })
    }

    #[instrument(skip(self))]
    pub async fn get_transfer(&self, transfer_id: Uuid) -> Result<TransferDetail, ServiceError> {
        let transfer = self.find_transfer(&*self.db, transfer_id).await?;
        let lines = InventoryTransferLines::find()
            .filter(inventory_transfer_line::Column::TransferId.eq(transfer_id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(TransferDetail { transfer, lines })
    }

    #[instrument(skip(self))]
    pub async fn list_transfers(
        &self,
        page: u64,
        limit: u64,
        status: Option<TransferStatus>,
    ) -> Result<(Vec<inventory_transfer::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let mut query = InventoryTransfers::find();
        if let Some(status) = status {
            query = query.filter(inventory_transfer::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(inventory_transfer::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let transfers = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((transfers, total))
    }

    async fn find_transfer<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        transfer_id: Uuid,
    ) -> Result<inventory_transfer::Model, ServiceError> {
        InventoryTransfers::find_by_id(transfer_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))
    }

    /// Zero-quantity destination row for a line whose triple has no ledger row
    /// at the destination yet. Copies sku/cost/thresholds from the source row
    /// when it still exists.
    async fn create_destination_row(
        &self,
        txn: &DatabaseTransaction,
        transfer: &inventory_transfer::Model,
        line: &inventory_transfer_line::Model,
    ) -> Result<inventory_item::Model, ServiceError> {
        let template = ledger::find_item(
            txn,
            line.product_id,
            line.variant_id,
            transfer.from_location_id,
        )
        .await
        .ok();

        let (sku, unit_cost, low, out) = match &template {
            Some(source) => (
                source.sku.clone(),
                source.unit_cost,
                source.low_stock_threshold,
                source.out_of_stock_threshold,
            ),
            None => (line.sku.clone(), Decimal::ZERO, 0, 0),
        };

        let item = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            location_id: Set(transfer.to_location_id),
            sku: Set(sku),
            available: Set(0),
            reserved: Set(0),
            committed: Set(0),
            on_hand: Set(0),
            low_stock_threshold: Set(low),
            out_of_stock_threshold: Set(out),
            low_stock_alert: Set(0 <= low),
            out_of_stock_alert: Set(0 <= out),
            unit_cost: Set(unit_cost),
            total_value: Set(Decimal::ZERO),
            version: Set(0),
            last_movement_date: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        item.insert(txn).await.map_err(ServiceError::db_error)
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "Failed to send transfer event");
        }
    }
}

fn transfer_number(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("TR-{}", simple[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_number_is_prefixed_and_short() {
        let number = transfer_number(Uuid::new_v4());
        assert!(number.starts_with("TR-"));
        assert_eq!(number.len(), 11);
    }
}
