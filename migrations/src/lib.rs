pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_locations_table;
mod m20250601_000002_create_inventory_items_table;
mod m20250601_000003_create_inventory_movements_table;
mod m20250601_000004_create_inventory_transfers_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_locations_table::Migration),
            Box::new(m20250601_000002_create_inventory_items_table::Migration),
            Box::new(m20250601_000003_create_inventory_movements_table::Migration),
            Box::new(m20250601_000004_create_inventory_transfers_table::Migration),
        ]
    }
}
