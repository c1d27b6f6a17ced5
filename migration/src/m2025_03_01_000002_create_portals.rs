//! Migration to create the portals table.
//!
//! Portals are the physical access points under maintenance. They are never
//! hard-deleted; `deleted_at` marks retirement.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Portals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Portals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Portals::InternalId).text().not_null())
                    .col(ColumnDef::new(Portals::Name).text().not_null())
                    .col(ColumnDef::new(Portals::AddressStreet).text().not_null())
                    .col(
                        ColumnDef::new(Portals::AddressZipcode)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Portals::AddressCity)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Portals::ContractorCompany).text().not_null())
                    .col(
                        ColumnDef::new(Portals::ContactPhone)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Portals::ContactEmail).text().null())
                    .col(ColumnDef::new(Portals::InstallationDate).date().not_null())
                    .col(
                        ColumnDef::new(Portals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Portals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Portals::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portals_internal_id")
                    .table(Portals::Table)
                    .col(Portals::InternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_portals_internal_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Portals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Portals {
    Table,
    Id,
    InternalId,
    Name,
    AddressStreet,
    AddressZipcode,
    AddressCity,
    ContractorCompany,
    ContactPhone,
    ContactEmail,
    InstallationDate,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
