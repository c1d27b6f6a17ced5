//! Intervention entity model
//!
//! One maintenance visit record. Created transactionally with its controls
//! and immutable afterwards except for soft delete.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Intervention entity representing one maintenance visit
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "interventions")]
pub struct Model {
    /// Unique identifier for the intervention (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Calendar date of the visit
    pub date: Date,

    /// Optional free-text summary written by the technician
    pub summary: Option<String>,

    /// Technician who performed the visit
    pub user_id: Uuid,

    /// Technician display name snapshotted at creation time. Deliberately
    /// not refreshed when the user later changes name: the report is an
    /// audit trail of who signed off at the time.
    pub user_name: String,

    pub portal_id: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portal::Entity",
        from = "Column::PortalId",
        to = "super::portal::Column::Id"
    )]
    Portal,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::control::Entity")]
    Control,
}

impl Related<super::portal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portal.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::control::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Control.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
