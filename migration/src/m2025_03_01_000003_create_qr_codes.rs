//! Migration to create the qr_codes table.
//!
//! One row per printed sticker. `portal_id` is non-null exactly when the
//! status is `associated`; the write path keeps that pairing and a partial
//! unique index (added in a follow-up migration) guards the one-code-per-portal
//! invariant at the store.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QrCodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(QrCodes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(QrCodes::PortalId).uuid().null())
                    .col(
                        ColumnDef::new(QrCodes::Status)
                            .string_len(20)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(QrCodes::AssociatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QrCodes::GeneratedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QrCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QrCodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QrCodes::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_qr_codes_portal_id")
                            .from(QrCodes::Table, QrCodes::PortalId)
                            .to(Portals::Table, Portals::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_qr_codes_portal_id")
                    .table(QrCodes::Table)
                    .col(QrCodes::PortalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_qr_codes_portal_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(QrCodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QrCodes {
    Table,
    Id,
    PortalId,
    Status,
    AssociatedAt,
    GeneratedAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Portals {
    Table,
    Id,
}
