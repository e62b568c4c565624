use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(InventoryItems::VariantId).uuid().not_null())
                    .col(ColumnDef::new(InventoryItems::LocationId).uuid().not_null())
                    .col(ColumnDef::new(InventoryItems::Sku).string().not_null())
                    .col(
                        ColumnDef::new(InventoryItems::Available)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Reserved)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Committed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::OnHand)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::LowStockThreshold)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::OutOfStockThreshold)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::LowStockAlert)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::OutOfStockAlert)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UnitCost)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::TotalValue)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::LastMovementDate)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryItems::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        // One ledger row per product/variant/location triple.
        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-items-triple")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::ProductId)
                    .col(InventoryItems::VariantId)
                    .col(InventoryItems::LocationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-items-location")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::LocationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-items-sku")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::Sku)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryItems {
    Table,
    Id,
    ProductId,
    VariantId,
    LocationId,
    Sku,
    Available,
    Reserved,
    Committed,
    OnHand,
    LowStockThreshold,
    OutOfStockThreshold,
    LowStockAlert,
    OutOfStockAlert,
    UnitCost,
    TotalValue,
    Version,
    LastMovementDate,
    CreatedAt,
    UpdatedAt,
}
