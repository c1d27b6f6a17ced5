//! Shared helpers for integration tests: an in-memory SQLite database with
//! all migrations applied, plus seed data builders.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use portal_maintenance::migration::{Migrator, MigratorTrait};
use portal_maintenance::models::{portal, user};
use portal_maintenance::repositories::{NewPortal, NewUser, PortalRepository, UserRepository};

/// Connects an in-memory SQLite database and applies all migrations.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("in-memory sqlite connects");
    Migrator::up(&db, None).await.expect("migrations apply");

    Arc::new(db)
}

pub fn new_portal(internal_id: &str) -> NewPortal {
    NewPortal {
        internal_id: internal_id.to_string(),
        name: format!("Portal {internal_id}"),
        address_street: "12 rue des Lilas".to_string(),
        address_zipcode: "69003".to_string(),
        address_city: "Lyon".to_string(),
        contractor_company: "Garde-Portail SARL".to_string(),
        contact_phone: "+33 4 00 00 00 00".to_string(),
        contact_email: Some("site@example.com".to_string()),
        installation_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
    }
}

pub async fn seed_portal(db: &Arc<DatabaseConnection>, internal_id: &str) -> portal::Model {
    PortalRepository::new(db.clone())
        .create(new_portal(internal_id))
        .await
        .expect("portal seeds")
}

pub async fn seed_user(db: &Arc<DatabaseConnection>, email: &str) -> user::Model {
    UserRepository::new(db.clone())
        .create(NewUser {
            email: email.to_string(),
            first_name: "Jo".to_string(),
            last_name: "Martin".to_string(),
            password_hash: portal_maintenance::auth::hash_password("password123")
                .expect("password hashes"),
        })
        .await
        .expect("user seeds")
}
