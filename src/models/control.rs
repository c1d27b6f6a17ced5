//! Control entity model
//!
//! One inspected checklist item inside an intervention. A row exists only
//! when the technician made an explicit pass/fail selection; items left
//! blank on the form produce no row at all.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category a control type belongs to on the inspection form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Security,
    Other,
}

/// The fixed set of inspectable items, partitioned into security-relevant
/// checks and general mechanical checks.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    // security
    #[sea_orm(string_value = "warning_lights")]
    WarningLights,
    #[sea_orm(string_value = "area_lighting")]
    AreaLighting,
    #[sea_orm(string_value = "safety_cells")]
    SafetyCells,
    #[sea_orm(string_value = "pressure_bar")]
    PressureBar,
    #[sea_orm(string_value = "floor_loop")]
    FloorLoop,
    #[sea_orm(string_value = "force_limiter")]
    ForceLimiter,
    #[sea_orm(string_value = "safety_springs")]
    SafetySprings,
    #[sea_orm(string_value = "floor_markings")]
    FloorMarkings,
    // other
    #[sea_orm(string_value = "apron_condition")]
    ApronCondition,
    #[sea_orm(string_value = "horizontal_rails")]
    HorizontalRails,
    #[sea_orm(string_value = "vertical_rails")]
    VerticalRails,
    #[sea_orm(string_value = "roller_condition")]
    RollerCondition,
    #[sea_orm(string_value = "drive_system")]
    DriveSystem,
    #[sea_orm(string_value = "limit_switches")]
    LimitSwitches,
    #[sea_orm(string_value = "control_devices")]
    ControlDevices,
    #[sea_orm(string_value = "control_panel")]
    ControlPanel,
    #[sea_orm(string_value = "manual_override")]
    ManualOverride,
}

impl ControlType {
    /// All known control types, security checks first.
    pub fn all() -> impl Iterator<Item = ControlType> {
        <ControlType as sea_orm::Iterable>::iter()
    }

    pub fn kind(&self) -> ControlKind {
        match self {
            ControlType::WarningLights
            | ControlType::AreaLighting
            | ControlType::SafetyCells
            | ControlType::PressureBar
            | ControlType::FloorLoop
            | ControlType::ForceLimiter
            | ControlType::SafetySprings
            | ControlType::FloorMarkings => ControlKind::Security,
            _ => ControlKind::Other,
        }
    }

    /// Parses the wire/database name of a control type.
    pub fn parse(name: &str) -> Option<ControlType> {
        use sea_orm::ActiveEnum;
        ControlType::try_from_value(&name.to_string()).ok()
    }

    /// Wire/database name of this control type.
    pub fn name(&self) -> String {
        use sea_orm::ActiveEnum;
        self.to_value()
    }
}

/// Control entity representing one explicitly inspected checklist item
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "controls")]
pub struct Model {
    /// Unique identifier for the control (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Which checklist item was inspected
    pub kind: ControlType,

    /// Pass (`true`) / fail (`false`); null means recorded without verdict
    pub result: Option<bool>,

    pub intervention_id: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::intervention::Entity",
        from = "Column::InterventionId",
        to = "super::intervention::Column::Id"
    )]
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
    fn control_types_partition_into_security_and_other() {
        let security = ControlType::all()
            .filter(|t| t.kind() == ControlKind::Security)
            .count();
        let other = ControlType::all()
            .filter(|t| t.kind() == ControlKind::Other)
            .count();
        assert_eq!(security, 8);
        assert_eq!(other, 9);
    }

    #[test]
    fn parse_accepts_known_names_and_rejects_unknown() {
        assert_eq!(
            ControlType::parse("warning_lights"),
            Some(ControlType::WarningLights)
        );
        assert_eq!(
            ControlType::parse("manual_override"),
            Some(ControlType::ManualOverride)
        );
        assert_eq!(ControlType::parse("coffee_machine"), None);
    }

    #[test]
    fn names_round_trip() {
        for t in ControlType::all() {
            assert_eq!(ControlType::parse(&t.name()), Some(t));
        }
    }
}
