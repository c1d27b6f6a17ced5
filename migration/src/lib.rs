//! Database migrations for the portal maintenance service.
//!
//! Migrations are applied in deterministic order and tracked by SeaORM's
//! migrations table.

pub use sea_orm_migration::prelude::*;

mod m2025_03_01_000001_create_users;
mod m2025_03_01_000002_create_portals;
mod m2025_03_01_000003_create_qr_codes;
mod m2025_03_01_000004_create_interventions;
mod m2025_03_01_000005_create_controls;
mod m2025_03_05_000100_add_qr_code_association_guard;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_03_01_000001_create_users::Migration),
            Box::new(m2025_03_01_000002_create_portals::Migration),
            Box::new(m2025_03_01_000003_create_qr_codes::Migration),
            Box::new(m2025_03_01_000004_create_interventions::Migration),
            Box::new(m2025_03_01_000005_create_controls::Migration),
            Box::new(m2025_03_05_000100_add_qr_code_association_guard::Migration),
        ]
    }
}
