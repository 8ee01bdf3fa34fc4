use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_client_types_table::ClientTypes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clients::FullName).string().not_null())
                    .col(ColumnDef::new(Clients::Phone).string().not_null())
                    .col(ColumnDef::new(Clients::Address).string().not_null())
                    .col(ColumnDef::new(Clients::BusinessName).string().null())
                    .col(ColumnDef::new(Clients::Neighborhood).string().null())
                    .col(ColumnDef::new(Clients::ClientTypeId).integer().not_null())
                    .col(ColumnDef::new(Clients::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_clients_client_type")
                            .from(Clients::Table, Clients::ClientTypeId)
                            .to(ClientTypes::Table, ClientTypes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_clients_full_name")
                    .table(Clients::Table)
                    .col(Clients::FullName)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Clients {
    Table,
    Id,
    FullName,
    Phone,
    Address,
    BusinessName,
    Neighborhood,
    ClientTypeId,
    CreatedAt,
}
