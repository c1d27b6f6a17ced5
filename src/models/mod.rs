//! # Data Models
//!
//! This module contains the SeaORM entities used throughout the portal
//! maintenance service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod control;
pub mod intervention;
pub mod portal;
pub mod qr_code;
pub mod user;

pub use control::Entity as Control;
pub use intervention::Entity as Intervention;
pub use portal::Entity as Portal;
pub use qr_code::Entity as QrCode;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "portal-maintenance".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
