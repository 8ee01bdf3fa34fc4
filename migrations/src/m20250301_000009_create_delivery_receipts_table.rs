use sea_orm_migration::prelude::*;

use crate::m20250301_000007_create_orders_table::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryReceipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryReceipts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    // One receipt per order; the order delete guard relies on this
                    .col(
                        ColumnDef::new(DeliveryReceipts::OrderId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DeliveryReceipts::ReceiptNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DeliveryReceipts::IssuedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_receipts_order")
                            .from(DeliveryReceipts::Table, DeliveryReceipts::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryReceipts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DeliveryReceipts {
    Table,
    Id,
    OrderId,
    ReceiptNumber,
    IssuedAt,
}
