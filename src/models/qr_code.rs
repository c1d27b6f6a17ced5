//! QR code entity model
//!
//! One row per printed sticker. The row id is the UUID encoded in the sticker
//! itself, so a scan resolves directly to this table.
//!
//! Invariant: `portal_id` is non-null exactly when `status` is `associated`,
//! and at most one row is `associated` per portal (guarded by a partial
//! unique index on `(portal_id) WHERE status = 'associated'`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a printed sticker
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum QrCodeStatus {
    /// Printed but not yet stuck onto a portal
    #[sea_orm(string_value = "available")]
    Available,
    /// Currently linked to a portal
    #[sea_orm(string_value = "associated")]
    Associated,
    /// Physically unusable, retired by an administrator
    #[sea_orm(string_value = "damaged")]
    Damaged,
    /// Removed from a portal and retired
    #[sea_orm(string_value = "lost")]
    Lost,
}

impl QrCodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrCodeStatus::Available => "available",
            QrCodeStatus::Associated => "associated",
            QrCodeStatus::Damaged => "damaged",
            QrCodeStatus::Lost => "lost",
        }
    }
}

/// QR code entity representing one printed, scannable sticker
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "qr_codes")]
pub struct Model {
    /// Sticker UUID (primary key, printed on the physical sticker)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Portal this sticker is currently associated with, if any
    pub portal_id: Option<Uuid>,

    pub status: QrCodeStatus,

    /// When the current association was made; null unless associated
    pub associated_at: Option<DateTimeWithTimeZone>,

    /// When the sticker was generated in its print batch
    pub generated_at: DateTimeWithTimeZone,

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
}

impl Related<super::portal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_value() {
        use sea_orm::ActiveEnum;
        for status in [
            QrCodeStatus::Available,
            QrCodeStatus::Associated,
            QrCodeStatus::Damaged,
            QrCodeStatus::Lost,
        ] {
            let value = status.to_value();
            assert_eq!(value, status.as_str());
            assert_eq!(QrCodeStatus::try_from_value(&value).unwrap(), status);
        }
    }
}
