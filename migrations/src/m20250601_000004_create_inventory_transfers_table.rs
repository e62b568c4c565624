use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransfers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransfers::TransferNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransfers::FromLocationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransfers::ToLocationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransfers::Status)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryTransfers::Notes).text().null())
                    .col(ColumnDef::new(InventoryTransfers::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(InventoryTransfers::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransfers::UpdatedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransfers::CompletedAt)
                            .timestamp()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryTransferLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransferLines::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransferLines::TransferId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransferLines::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransferLines::VariantId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransferLines::Sku)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransferLines::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transfer-lines-transfer")
                            .from(
                                InventoryTransferLines::Table,
                                InventoryTransferLines::TransferId,
                            )
                            .to(InventoryTransfers::Table, InventoryTransfers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-transfer-lines-transfer")
                    .table(InventoryTransferLines::Table)
                    .col(InventoryTransferLines::TransferId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory-transfers-status")
                    .table(InventoryTransfers::Table)
                    .col(InventoryTransfers::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(InventoryTransferLines::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(InventoryTransfers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryTransfers {
    Table,
    Id,
    TransferNumber,
    FromLocationId,
    ToLocationId,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum InventoryTransferLines {
    Table,
    Id,
    TransferId,
    ProductId,
    VariantId,
    Sku,
    Quantity,
}
