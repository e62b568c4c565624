use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of ledger mutations recorded on the movement trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    Adjustment,
    Sale,
    Return,
    TransferIn,
    TransferOut,
    Restock,
    Damage,
    Theft,
    Count,
    Reservation,
    Release,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Adjustment => "adjustment",
            MovementType::Sale => "sale",
            MovementType::Return => "return",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Restock => "restock",
            MovementType::Damage => "damage",
            MovementType::Theft => "theft",
            MovementType::Count => "count",
            MovementType::Reservation => "reservation",
            MovementType::Release => "release",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "adjustment" => Some(MovementType::Adjustment),
            "sale" => Some(MovementType::Sale),
            "return" => Some(MovementType::Return),
            "transfer_in" => Some(MovementType::TransferIn),
            "transfer_out" => Some(MovementType::TransferOut),
            "restock" => Some(MovementType::Restock),
            "damage" => Some(MovementType::Damage),
            "theft" => Some(MovementType::Theft),
            "count" => Some(MovementType::Count),
            "reservation" => Some(MovementType::Reservation),
            "release" => Some(MovementType::Release),
            _ => None,
        }
    }
}

/// Append-only audit record, one per ledger mutation.
///
/// Rows are never updated or deleted, and carry full before/after snapshots of
/// all four quantity fields so reconciliation never needs to replay history.
/// No foreign key to `inventory_items`: history outlives the ledger row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    /// Database-assigned insertion sequence; total order of the trail, even
    /// for movements sharing a `created_at` instant.
    #[sea_orm(primary_key)]
    pub seq: i64,
    #[sea_orm(unique)]
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: String,
    /// Signed delta applied: the change to `on_hand`, or to `available` for
    /// reservation/release movements that only shift between pools.
    pub quantity: i32,
    pub before_available: i32,
    pub before_reserved: i32,
    pub before_committed: i32,
    pub before_on_hand: i32,
    pub after_available: i32,
    pub after_reserved: i32,
    pub after_committed: i32,
    pub after_on_hand: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reason: Option<String>,
    /// Acting admin; absent for system-triggered movements.
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.id {
            active_model.id = Set(Uuid::new_v4());
        }
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips_through_strings() {
        let all = [
            MovementType::Adjustment,
            MovementType::Sale,
            MovementType::Return,
            MovementType::TransferIn,
            MovementType::TransferOut,
            MovementType::Restock,
            MovementType::Damage,
            MovementType::Theft,
            MovementType::Count,
            MovementType::Reservation,
            MovementType::Release,
        ];
        for ty in all {
            assert_eq!(MovementType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(MovementType::from_str("unknown"), None);
    }
}
