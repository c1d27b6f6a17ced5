//! User repository for database operations
//!
//! Lookups used by login and session resolution, plus registration.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::user::{self, Entity as User};

/// Fields required to register a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2id PHC string, hashed by the caller
    pub password_hash: String,
}

/// Repository for user database operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Creates a new UserRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds an active user by login email.
    pub async fn find_active_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?)
    }

    /// Finds a user by email regardless of active flag (registration check).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?)
    }

    /// Finds a user by id.
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<user::Model>> {
        Ok(User::find_by_id(*id).one(&*self.db).await?)
    }

    /// Creates a new active user record.
    pub async fn create(&self, new_user: NewUser) -> Result<user::Model> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let active = user::ActiveModel {
            id: Set(id),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            password_hash: Set(new_user.password_hash),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = User::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("user not persisted"))
    }
}
