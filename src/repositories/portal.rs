//! Portal repository for database operations
//!
//! Portal CRUD with soft delete. The "associated QR code" of a portal is a
//! derived lookup against `qr_codes`; its absence is not an error.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::portal::{self, Entity as Portal};
use crate::models::qr_code::{self, Entity as QrCode, QrCodeStatus};

/// Fields required to register a new portal.
#[derive(Debug, Clone)]
pub struct NewPortal {
    pub internal_id: String,
    pub name: String,
    pub address_street: String,
    pub address_zipcode: String,
    pub address_city: String,
    pub contractor_company: String,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub installation_date: NaiveDate,
}

/// Partial update of a portal's editable fields. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct PortalUpdate {
    pub name: Option<String>,
    pub address_street: Option<String>,
    pub address_zipcode: Option<String>,
    pub address_city: Option<String>,
    pub contractor_company: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub installation_date: Option<NaiveDate>,
}

/// Repository for portal database operations
#[derive(Debug, Clone)]
pub struct PortalRepository {
    pub db: Arc<DatabaseConnection>,
}

impl PortalRepository {
    /// Creates a new PortalRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new portal record.
    pub async fn create(&self, new_portal: NewPortal) -> Result<portal::Model> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let active = portal::ActiveModel {
            id: Set(id),
            internal_id: Set(new_portal.internal_id),
            name: Set(new_portal.name),
            address_street: Set(new_portal.address_street),
            address_zipcode: Set(new_portal.address_zipcode),
            address_city: Set(new_portal.address_city),
            contractor_company: Set(new_portal.contractor_company),
            contact_phone: Set(new_portal.contact_phone),
            contact_email: Set(new_portal.contact_email),
            installation_date: Set(new_portal.installation_date),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        };
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Portal::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("portal not persisted"))
    }

    /// Lists all live portals ordered by name.
    pub async fn list(&self) -> Result<Vec<portal::Model>> {
        Ok(Portal::find()
            .filter(portal::Column::DeletedAt.is_null())
            .order_by_asc(portal::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Finds a live portal by id.
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<portal::Model>> {
        Ok(Portal::find_by_id(*id)
            .filter(portal::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?)
    }

    /// Updates a portal's editable fields.
    pub async fn update(&self, id: &Uuid, update: PortalUpdate) -> Result<Option<portal::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut model: portal::ActiveModel = existing.into();

        if let Some(name) = update.name {
            model.name = Set(name);
        }
        if let Some(street) = update.address_street {
            model.address_street = Set(street);
        }
        if let Some(zipcode) = update.address_zipcode {
            model.address_zipcode = Set(zipcode);
        }
        if let Some(city) = update.address_city {
            model.address_city = Set(city);
        }
        if let Some(company) = update.contractor_company {
            model.contractor_company = Set(company);
        }
        if let Some(phone) = update.contact_phone {
            model.contact_phone = Set(phone);
        }
        if let Some(email) = update.contact_email {
            model.contact_email = Set(email);
        }
        if let Some(date) = update.installation_date {
            model.installation_date = Set(date);
        }
        model.updated_at = Set(chrono::Utc::now().into());

        Ok(Some(model.update(&*self.db).await?))
    }

    /// Soft-deletes a portal. Returns whether a live portal was marked.
    pub async fn soft_delete(&self, id: &Uuid) -> Result<bool> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        let mut model: portal::ActiveModel = existing.into();
        let now = chrono::Utc::now();
        model.deleted_at = Set(Some(now.into()));
        model.updated_at = Set(now.into());
        model.update(&*self.db).await?;

        Ok(true)
    }

    /// Returns the QR code currently associated with the portal, if any.
    /// "No code" is a normal outcome, not an error.
    pub async fn associated_qr_code(&self, portal_id: &Uuid) -> Result<Option<qr_code::Model>> {
        Ok(QrCode::find()
            .filter(qr_code::Column::PortalId.eq(*portal_id))
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Associated))
            .filter(qr_code::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?)
    }
}
