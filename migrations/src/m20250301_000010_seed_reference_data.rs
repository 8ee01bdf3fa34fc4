use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_client_types_table::ClientTypes;
use crate::m20250301_000005_create_price_lists_table::PriceLists;
use crate::m20250301_000006_create_order_statuses_table::OrderStatuses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reference rows the handlers resolve by id or name. Ids are fixed:
        // new orders default to status 1 and new lines to price list 1.
        manager
            .exec_stmt(
                Query::insert()
                    .into_table(ClientTypes::Table)
                    .columns([ClientTypes::Id, ClientTypes::Name])
                    .values_panic([1.into(), "Normal".into()])
                    .values_panic([2.into(), "Premium".into()])
                    .to_owned(),
            )
            .await?;

        manager
            .exec_stmt(
                Query::insert()
                    .into_table(OrderStatuses::Table)
                    .columns([OrderStatuses::Id, OrderStatuses::Name])
                    .values_panic([1.into(), "Pendiente".into()])
                    .values_panic([2.into(), "Entregado".into()])
                    .values_panic([3.into(), "Cancelado".into()])
                    .to_owned(),
            )
            .await?;

        manager
            .exec_stmt(
                Query::insert()
                    .into_table(PriceLists::Table)
                    .columns([PriceLists::Id, PriceLists::Name])
                    .values_panic([1.into(), "standard".into()])
                    .values_panic([2.into(), "premium".into()])
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(PriceLists::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(OrderStatuses::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(ClientTypes::Table).to_owned())
            .await
    }
}
