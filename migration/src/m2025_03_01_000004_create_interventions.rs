//! Migration to create the interventions table.
//!
//! `user_name` is a snapshot of the technician's display name at creation
//! time; it is never refreshed from the users table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Interventions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Interventions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Interventions::Date).date().not_null())
                    .col(ColumnDef::new(Interventions::Summary).text().null())
                    .col(ColumnDef::new(Interventions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Interventions::UserName).text().not_null())
                    .col(ColumnDef::new(Interventions::PortalId).uuid().not_null())
                    .col(
                        ColumnDef::new(Interventions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Interventions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Interventions::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interventions_user_id")
                            .from(Interventions::Table, Interventions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interventions_portal_id")
                            .from(Interventions::Table, Interventions::PortalId)
                            .to(Portals::Table, Portals::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_interventions_portal_id")
                    .table(Interventions::Table)
                    .col(Interventions::PortalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_interventions_portal_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Interventions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Interventions {
    Table,
    Id,
    Date,
    Summary,
    UserId,
    UserName,
    PortalId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Portals {
    Table,
    Id,
}
