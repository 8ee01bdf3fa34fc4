use sea_orm_migration::prelude::*;

use crate::m20250301_000004_create_products_table::Products;
use crate::m20250301_000005_create_price_lists_table::PriceLists;
use crate::m20250301_000007_create_orders_table::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderLines::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderLines::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderLines::ProductId).integer().not_null())
                    .col(
                        ColumnDef::new(OrderLines::Quantity)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderLines::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderLines::PriceListId).integer().not_null())
                    .col(
                        ColumnDef::new(OrderLines::Subtotal)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_lines_order")
                            .from(OrderLines::Table, OrderLines::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_lines_product")
                            .from(OrderLines::Table, OrderLines::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_lines_price_list")
                            .from(OrderLines::Table, OrderLines::PriceListId)
                            .to(PriceLists::Table, PriceLists::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_lines_order_id")
                    .table(OrderLines::Table)
                    .col(OrderLines::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderLines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum OrderLines {
    Table,
    Id,
    OrderId,
    ProductId,
    Quantity,
    UnitPrice,
    PriceListId,
    Subtotal,
}
