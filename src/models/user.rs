//! User entity model
//!
//! Technicians register an account, authenticate via the session cookie, and
//! are referenced by the interventions they perform.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity representing a registered technician
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login email (unique)
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id PHC hash of the password, never the password itself
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Inactive users cannot log in
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Display name used wherever the technician is shown or snapshotted.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::intervention::Entity")]
    Intervention,
}

impl Related<super::intervention::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Intervention.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let user = Model {
            id: Uuid::new_v4(),
            email: "jo@example.com".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Martin".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            is_active: true,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };
        assert_eq!(user.full_name(), "Jo Martin");
    }
}
