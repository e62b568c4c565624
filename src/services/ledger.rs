//! Ledger Store
//!
//! Durable storage of inventory items and their append-only movement trail.
//! This module owns the two write primitives every mutation goes through:
//! [`apply_delta`], a version-guarded conditional update of one ledger row, and
//! [`record_movement`], the immutable audit insert. All other components
//! (reservation engine, transfer workflow) mutate quantities only through
//! these, inside a single transaction per operation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::inventory_item::{self, Entity as InventoryItems};
use crate::entities::inventory_movement::{self, Entity as InventoryMovements, MovementType};
use crate::entities::location::{self, Entity as Locations, LocationType};
use crate::errors::ServiceError;

/// Signed changes to the four quantity pools of one ledger row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantityDelta {
    pub available: i32,
    pub reserved: i32,
    pub committed: i32,
    pub on_hand: i32,
}

/// Descriptor for the movement row written alongside a quantity change.
#[derive(Debug, Clone)]
pub struct MovementEntry {
    pub movement_type: MovementType,
    /// Signed delta applied; see `inventory_movement::Model::quantity`.
    pub quantity: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Input for provisioning a new ledger row.
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub location_id: Uuid,
    pub sku: String,
    pub initial_quantity: i32,
    pub low_stock_threshold: i32,
    pub out_of_stock_threshold: i32,
    pub unit_cost: Decimal,
    pub created_by: Option<Uuid>,
}

/// Input for registering a stock-holding location.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub location_type: LocationType,
    pub address: Option<String>,
}

/// Optional filters for movement listing.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub inventory_item_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub reference_id: Option<Uuid>,
}

fn checked_apply(field: &'static str, current: i32, delta: i32) -> Result<i32, ServiceError> {
    let next = current.checked_add(delta).ok_or_else(|| {
        ServiceError::InvariantViolation(format!("{} overflows ({} + {})", field, current, delta))
    })?;
    if next < 0 {
        return Err(ServiceError::InvariantViolation(format!(
            "{} would go negative ({} + {})",
            field, current, delta
        )));
    }
    Ok(next)
}

/// Computes the post-delta state of a ledger row: new quantities, recomputed
/// alert flags and total value, stamped movement date, bumped version.
pub(crate) fn compute_updated(
    item: &inventory_item::Model,
    delta: &QuantityDelta,
    now: DateTime<Utc>,
) -> Result<inventory_item::Model, ServiceError> {
    let available = checked_apply("available", item.available, delta.available)?;
    let reserved = checked_apply("reserved", item.reserved, delta.reserved)?;
    let committed = checked_apply("committed", item.committed, delta.committed)?;
    let on_hand = checked_apply("on_hand", item.on_hand, delta.on_hand)?;

    let mut updated = item.clone();
    updated.available = available;
    updated.reserved = reserved;
    updated.committed = committed;
    updated.on_hand = on_hand;
    updated.low_stock_alert = available <= item.low_stock_threshold;
    updated.out_of_stock_alert = available <= item.out_of_stock_threshold;
    updated.total_value = Decimal::from(on_hand) * item.unit_cost;
    updated.version = item.version + 1;
    updated.last_movement_date = Some(now);
    updated.updated_at = Some(now);
    Ok(updated)
}

/// Applies a quantity delta to one ledger row as a single conditional update.
///
/// The update filter includes the version read by the caller, so a concurrent
/// writer makes this a no-op and the caller gets `ConcurrentModification` to
/// retry with a fresh read. Non-negativity is enforced before the write.
pub(crate) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    item: &inventory_item::Model,
    delta: &QuantityDelta,
) -> Result<inventory_item::Model, ServiceError> {
    let updated = compute_updated(item, delta, Utc::now())?;

    let result = InventoryItems::update_many()
        .col_expr(inventory_item::Column::Available, Expr::value(updated.available))
        .col_expr(inventory_item::Column::Reserved, Expr::value(updated.reserved))
        .col_expr(inventory_item::Column::Committed, Expr::value(updated.committed))
        .col_expr(inventory_item::Column::OnHand, Expr::value(updated.on_hand))
        .col_expr(
            inventory_item::Column::LowStockAlert,
            Expr::value(updated.low_stock_alert),
        )
        .col_expr(
            inventory_item::Column::OutOfStockAlert,
            Expr::value(updated.out_of_stock_alert),
        )
        .col_expr(
            inventory_item::Column::TotalValue,
            Expr::value(updated.total_value),
        )
        .col_expr(inventory_item::Column::Version, Expr::value(updated.version))
        .col_expr(
            inventory_item::Column::LastMovementDate,
            Expr::value(updated.last_movement_date),
        )
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(updated.updated_at))
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::Version.eq(item.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(item.id));
    }

    Ok(updated)
}

/// Appends one immutable movement row with full before/after snapshots.
pub(crate) async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    before: &inventory_item::Model,
    after: &inventory_item::Model,
    entry: MovementEntry,
) -> Result<inventory_movement::Model, ServiceError> {
    // `seq` stays unset so the database assigns the next insertion number.
    let movement = inventory_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        inventory_item_id: Set(before.id),
        product_id: Set(before.product_id),
        variant_id: Set(before.variant_id),
        location_id: Set(before.location_id),
        movement_type: Set(entry.movement_type.as_str().to_string()),
        quantity: Set(entry.quantity),
        before_available: Set(before.available),
        before_reserved: Set(before.reserved),
        before_committed: Set(before.committed),
        before_on_hand: Set(before.on_hand),
        after_available: Set(after.available),
        after_reserved: Set(after.reserved),
        after_committed: Set(after.committed),
        after_on_hand: Set(after.on_hand),
        reference_type: Set(entry.reference_type),
        reference_id: Set(entry.reference_id),
        reason: Set(entry.reason),
        user_id: Set(entry.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    movement.insert(conn).await.map_err(ServiceError::db_error)
}

/// Queryable store of ledger rows and their movement history.
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<DatabaseConnection>,
}

impl LedgerStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Looks up the ledger row for a product/variant/location triple.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        product_id: Uuid,
        variant_id: Uuid,
        location_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        find_item(&*self.db, product_id, variant_id, location_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, item_id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        InventoryItems::find_by_id(item_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))
    }

    /// Provisions stock for a variant at a location.
    ///
    /// Fails if the triple already has a ledger row; engine operations never
    /// auto-create rows, so this is the only way stock enters the ledger.
    #[instrument(skip(self, new_item), fields(sku = %new_item.sku))]
    pub async fn provision(
        &self,
        new_item: NewInventoryItem,
    ) -> Result<inventory_item::Model, ServiceError> {
        if new_item.sku.trim().is_empty() {
            return Err(ServiceError::ValidationError("SKU must not be empty".into()));
        }
        if new_item.initial_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Initial quantity must not be negative".into(),
            ));
        }
        if new_item.low_stock_threshold < 0 || new_item.out_of_stock_threshold < 0 {
            return Err(ServiceError::ValidationError(
                "Thresholds must not be negative".into(),
            ));
        }
        if new_item.unit_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit cost must not be negative".into(),
            ));
        }

        let db = self.db.clone();
        db.transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = InventoryItems::find()
                    .filter(inventory_item::Column::ProductId.eq(new_item.product_id))
                    .filter(inventory_item::Column::VariantId.eq(new_item.variant_id))
                    .filter(inventory_item::Column::LocationId.eq(new_item.location_id))
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if existing.is_some() {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Inventory already provisioned for product {} variant {} at location {}",
                        new_item.product_id, new_item.variant_id, new_item.location_id
                    )));
                }

                let now = Utc::now();
                let quantity = new_item.initial_quantity;
                let item = inventory_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(new_item.product_id),
                    variant_id: Set(new_item.variant_id),
                    location_id: Set(new_item.location_id),
                    sku: Set(new_item.sku.clone()),
                    available: Set(quantity),
                    reserved: Set(0),
                    committed: Set(0),
                    on_hand: Set(quantity),
                    low_stock_threshold: Set(new_item.low_stock_threshold),
                    out_of_stock_threshold: Set(new_item.out_of_stock_threshold),
                    low_stock_alert: Set(quantity <= new_item.low_stock_threshold),
                    out_of_stock_alert: Set(quantity <= new_item.out_of_stock_threshold),
                    unit_cost: Set(new_item.unit_cost),
                    total_value: Set(Decimal::from(quantity) * new_item.unit_cost),
                    version: Set(0),
                    last_movement_date: Set(if quantity > 0 { Some(now) } else { None }),
                    created_at: Set(now),
                    updated_at: Set(None),
                };
                let item = item.insert(txn).await.map_err(ServiceError::db_error)?;

                if quantity > 0 {
                    let mut before = item.clone();
                    before.available = 0;
                    before.on_hand = 0;
                    record_movement(
                        txn,
                        &before,
                        &item,
                        MovementEntry {
                            movement_type: MovementType::Adjustment,
                            quantity,
                            reference_type: None,
                            reference_id: None,
                            reason: Some("initial provisioning".to_string()),
                            user_id: new_item.created_by,
                        },
                    )
                    .await?;
                }

                info!(item_id = %item.id, sku = %item.sku, quantity, "Provisioned inventory item");
                Ok(item)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    /// Removes a ledger row. Movement history is retained: audit records are
    /// never deleted, even when the item they describe goes away.
    #[instrument(skip(self))]
    pub async fn delete(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let item = self.get_by_id(item_id).await?;
        if item.reserved > 0 || item.committed > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot delete inventory item {} with {} reserved and {} committed units",
                item_id, item.reserved, item.committed
            )));
        }

        InventoryItems::delete_by_id(item_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(item_id = %item_id, "Deleted inventory item (movement history retained)");
        Ok(())
    }

    /// Lists ledger rows with pagination.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        validate_pagination(page, limit)?;

        let paginator = InventoryItems::find()
            .order_by_asc(inventory_item::Column::Sku)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Rows with a low-stock or out-of-stock alert set, for polling consumers.
    #[instrument(skip(self))]
    pub async fn list_alerted_items(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        InventoryItems::find()
            .filter(
                Condition::any()
                    .add(inventory_item::Column::LowStockAlert.eq(true))
                    .add(inventory_item::Column::OutOfStockAlert.eq(true)),
            )
            .order_by_asc(inventory_item::Column::Sku)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Registers a location in the static reference table. Locations carry no
    /// stock invariants; ledger rows reference them by id only.
    #[instrument(skip(self, new_location), fields(name = %new_location.name))]
    pub async fn register_location(
        &self,
        new_location: NewLocation,
    ) -> Result<location::Model, ServiceError> {
        if new_location.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Location name must not be empty".into(),
            ));
        }

        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_location.name),
            location_type: Set(new_location.location_type.as_str().to_string()),
            address: Set(new_location.address),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        model.insert(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list_locations(
        &self,
        active_only: bool,
    ) -> Result<Vec<location::Model>, ServiceError> {
        let mut query = Locations::find();
        if active_only {
            query = query.filter(location::Column::Active.eq(true));
        }
        query
            .order_by_asc(location::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Read-only movement listing for audit and reporting.
    #[instrument(skip(self, filter))]
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory_movement::Model>, u64), ServiceError> {
        validate_pagination(page, limit)?;

        let mut query = InventoryMovements::find();
        if let Some(item_id) = filter.inventory_item_id {
            query = query.filter(inventory_movement::Column::InventoryItemId.eq(item_id));
        }
        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory_movement::Column::ProductId.eq(product_id));
        }
        if let Some(location_id) = filter.location_id {
            query = query.filter(inventory_movement::Column::LocationId.eq(location_id));
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(inventory_movement::Column::MovementType.eq(movement_type.as_str()));
        }
        if let Some(reference_id) = filter.reference_id {
            query = query.filter(inventory_movement::Column::ReferenceId.eq(reference_id));
        }

        let paginator = query
            .order_by_desc(inventory_movement::Column::CreatedAt)
            .order_by_desc(inventory_movement::Column::Seq)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let movements = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((movements, total))
    }
}

/// Triple lookup usable both on the pool and inside transactions.
pub(crate) async fn find_item<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variant_id: Uuid,
    location_id: Uuid,
) -> Result<inventory_item::Model, ServiceError> {
    InventoryItems::find()
        .filter(inventory_item::Column::ProductId.eq(product_id))
        .filter(inventory_item::Column::VariantId.eq(variant_id))
        .filter(inventory_item::Column::LocationId.eq(location_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "No inventory for product {} variant {} at location {}",
                product_id, variant_id, location_id
            ))
        })
}

fn validate_pagination(page: u64, limit: u64) -> Result<(), ServiceError> {
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
    Ok(())
}
