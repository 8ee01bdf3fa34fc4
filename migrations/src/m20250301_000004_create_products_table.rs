use sea_orm_migration::prelude::*;

use crate::m20250301_000003_create_product_categories_table::ProductCategories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Description).string().null())
                    .col(ColumnDef::new(Products::UnitOfMeasure).string().null())
                    .col(ColumnDef::new(Products::CategoryId).integer().null())
                    .col(ColumnDef::new(Products::Stock).decimal_len(12, 2).null())
                    .col(
                        ColumnDef::new(Products::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category")
                            .from(Products::Table, Products::CategoryId)
                            .to(ProductCategories::Table, ProductCategories::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    Id,
    Name,
    Description,
    UnitOfMeasure,
    CategoryId,
    Stock,
    UnitPrice,
    CreatedAt,
}
