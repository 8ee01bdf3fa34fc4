pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_client_types_table;
mod m20250301_000002_create_clients_table;
mod m20250301_000003_create_product_categories_table;
mod m20250301_000004_create_products_table;
mod m20250301_000005_create_price_lists_table;
mod m20250301_000006_create_order_statuses_table;
mod m20250301_000007_create_orders_table;
mod m20250301_000008_create_order_lines_table;
mod m20250301_000009_create_delivery_receipts_table;
mod m20250301_000010_seed_reference_data;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_client_types_table::Migration),
            Box::new(m20250301_000002_create_clients_table::Migration),
            Box::new(m20250301_000003_create_product_categories_table::Migration),
            Box::new(m20250301_000004_create_products_table::Migration),
            Box::new(m20250301_000005_create_price_lists_table::Migration),
            Box::new(m20250301_000006_create_order_statuses_table::Migration),
            Box::new(m20250301_000007_create_orders_table::Migration),
            Box::new(m20250301_000008_create_order_lines_table::Migration),
            Box::new(m20250301_000009_create_delivery_receipts_table::Migration),
            Box::new(m20250301_000010_seed_reference_data::Migration),
        ]
    }
}
