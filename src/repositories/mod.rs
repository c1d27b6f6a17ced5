//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities. Handlers receive repository handles
//! built from the shared pool; nothing here reaches for global state.

pub mod intervention;
pub mod portal;
pub mod qr_code;
pub mod user;

pub use intervention::{InterventionError, InterventionRepository, NewIntervention};
pub use portal::{NewPortal, PortalRepository, PortalUpdate};
pub use qr_code::{AssociationError, QrCodeRepository};
pub use user::{NewUser, UserRepository};
