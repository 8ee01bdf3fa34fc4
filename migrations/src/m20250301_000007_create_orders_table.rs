use sea_orm_migration::prelude::*;

use crate::m20250301_000002_create_clients_table::Clients;
use crate::m20250301_000006_create_order_statuses_table::OrderStatuses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::ClientId).integer().not_null())
                    .col(ColumnDef::new(Orders::OrderDate).timestamp().not_null())
                    .col(
                        ColumnDef::new(Orders::StatusId)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Orders::Notes).text().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_client")
                            .from(Orders::Table, Orders::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_status")
                            .from(Orders::Table, Orders::StatusId)
                            .to(OrderStatuses::Table, OrderStatuses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Client order history and the "today" window both filter on these
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_client_id")
                    .table(Orders::Table)
                    .col(Orders::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_order_date")
                    .table(Orders::Table)
                    .col(Orders::OrderDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    ClientId,
    OrderDate,
    StatusId,
    Notes,
    CreatedAt,
    UpdatedAt,
}
