use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Deliberately no foreign key to inventory_items: movement history must
        // survive deletion of the ledger row it describes.
        manager
            .create_table(
                Table::create()
                    .table(InventoryMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryMovements::Seq)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::Id)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::InventoryItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::VariantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::LocationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::MovementType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::BeforeAvailable)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::BeforeReserved)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::BeforeCommitted)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::BeforeOnHand)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::AfterAvailable)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::AfterReserved)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::AfterCommitted)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::AfterOnHand)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::ReferenceType)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::ReferenceId)
                            .uuid()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryMovements::Reason).string().null())
                    .col(ColumnDef::new(InventoryMovements::UserId).uuid().null())
                    .col(
                        ColumnDef::new(InventoryMovements::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-movements-item")
                    .table(InventoryMovements::Table)
                    .col(InventoryMovements::InventoryItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-movements-reference")
                    .table(InventoryMovements::Table)
                    .col(InventoryMovements::ReferenceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-movements-created-at")
                    .table(InventoryMovements::Table)
                    .col(InventoryMovements::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryMovements {
    Table,
    Seq,
    Id,
    InventoryItemId,
    ProductId,
    VariantId,
    LocationId,
    MovementType,
    Quantity,
    BeforeAvailable,
    BeforeReserved,
    BeforeCommitted,
    BeforeOnHand,
    AfterAvailable,
    AfterReserved,
    AfterCommitted,
    AfterOnHand,
    ReferenceType,
    ReferenceId,
    Reason,
    UserId,
    CreatedAt,
}
