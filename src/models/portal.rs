//! Portal entity model
//!
//! A portal is a physical access point (gate/barrier) under maintenance.
//! Portals are soft-deleted only. The currently associated QR code is a
//! derived view queried through `qr_codes.portal_id`; the portal row itself
//! never stores it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Portal entity representing a maintained access point
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "portals")]
pub struct Model {
    /// Unique identifier for the portal (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-facing identifier printed on site documents (unique)
    pub internal_id: String,

    pub name: String,

    pub address_street: String,

    pub address_zipcode: String,

    pub address_city: String,

    /// Company contracted for maintenance of this portal
    pub contractor_company: String,

    pub contact_phone: String,

    pub contact_email: Option<String>,

    pub installation_date: Date,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Soft-delete marker; portals are never hard-deleted
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::qr_code::Entity")]
    QrCode,
    #[sea_orm(has_many = "super::intervention::Entity")]
    Intervention,
}

impl Related<super::qr_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QrCode.def()
    }
}

impl Related<super::intervention::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Intervention.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
