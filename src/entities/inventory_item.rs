use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ledger row per product/variant/location triple.
///
/// Quantity accounting: `on_hand == available + reserved` at all times.
/// `committed` counts units already shipped against an order (deducted from
/// `on_hand`) that are still inside the settlement/return window.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub location_id: Uuid,
    pub sku: String,
    pub available: i32,
    pub reserved: i32,
    pub committed: i32,
    pub on_hand: i32,
    pub low_stock_threshold: i32,
    pub out_of_stock_threshold: i32,
    pub low_stock_alert: bool,
    pub out_of_stock_alert: bool,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_value: Decimal,
    /// Optimistic-lock counter; every quantity write is conditioned on it.
    pub version: i32,
    pub last_movement_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Point-in-time copy of the four quantity fields, as recorded on movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitySnapshot {
    pub available: i32,
    pub reserved: i32,
    pub committed: i32,
    pub on_hand: i32,
}

impl Model {
    pub fn snapshot(&self) -> QuantitySnapshot {
        QuantitySnapshot {
            available: self.available,
            reserved: self.reserved,
            committed: self.committed,
            on_hand: self.on_hand,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.available <= self.low_stock_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.available <= self.out_of_stock_threshold
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        } else {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}
