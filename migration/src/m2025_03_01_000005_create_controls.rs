//! Migration to create the controls table.
//!
//! One row per checklist item the technician explicitly inspected during an
//! intervention. Controls are created only inside the intervention creation
//! transaction and cascade with it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Controls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Controls::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Controls::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Controls::Result).boolean().null())
                    .col(ColumnDef::new(Controls::InterventionId).uuid().not_null())
                    .col(
                        ColumnDef::new(Controls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Controls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Controls::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_controls_intervention_id")
                            .from(Controls::Table, Controls::InterventionId)
                            .to(Interventions::Table, Interventions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_controls_intervention_id")
                    .table(Controls::Table)
                    .col(Controls::InterventionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_controls_intervention_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Controls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Controls {
    Table,
    Id,
    Kind,
    Result,
    InterventionId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Interventions {
    Table,
    Id,
}
