//! # Portal Handlers
//!
//! Public portal view plus the admin portal CRUD surface. The admin detail
//! view also carries the derived associated-QR-code and the portal's
//! intervention history.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::interventions::InterventionDto;
use crate::handlers::parse_date;
use crate::handlers::qr_codes::QrCodeDto;
use crate::models::portal;
use crate::repositories::{
    InterventionRepository, NewPortal, PortalRepository, PortalUpdate,
};
use crate::server::AppState;

/// Portal representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortalDto {
    pub id: Uuid,
    #[schema(example = "P-0042")]
    pub internal_id: String,
    pub name: String,
    pub address_street: String,
    pub address_zipcode: String,
    pub address_city: String,
    pub contractor_company: String,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    #[schema(example = "2019-06-01")]
    pub installation_date: String,
}

impl From<portal::Model> for PortalDto {
    fn from(model: portal::Model) -> Self {
        Self {
            id: model.id,
            internal_id: model.internal_id,
            name: model.name,
            address_street: model.address_street,
            address_zipcode: model.address_zipcode,
            address_city: model.address_city,
            contractor_company: model.contractor_company,
            contact_phone: model.contact_phone,
            contact_email: model.contact_email,
            installation_date: model.installation_date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Admin detail view: the portal, its currently associated QR code (if
/// any) and its intervention history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortalDetailDto {
    #[serde(flatten)]
    pub portal: PortalDto,
    pub qr_code: Option<QrCodeDto>,
    pub interventions: Vec<InterventionDto>,
}

/// Request payload for registering a portal
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePortalRequestDto {
    pub internal_id: String,
    pub name: String,
    pub address_street: String,
    pub address_zipcode: String,
    pub address_city: String,
    pub contractor_company: String,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    #[schema(example = "2019-06-01")]
    pub installation_date: String,
}

/// Request payload for editing a portal; omitted fields stay unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePortalRequestDto {
    pub name: Option<String>,
    pub address_street: Option<String>,
    pub address_zipcode: Option<String>,
    pub address_city: Option<String>,
    pub contractor_company: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub installation_date: Option<String>,
}

/// Public portal view reached from a scanned sticker
#[utoipa::path(
    get,
    path = "/portals/{id}",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    responses(
        (status = 200, description = "Portal", body = PortalDto),
        (status = 404, description = "Portal not found", body = ApiError)
    ),
    tag = "portals"
)]
pub async fn get_portal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PortalDto>, ApiError> {
    let portal = PortalRepository::new(state.db.clone())
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found("Portal not found"))?;

    Ok(Json(portal.into()))
}

/// List all portals (admin)
#[utoipa::path(
    get,
    path = "/admin/portals",
    responses(
        (status = 200, description = "Portals ordered by name", body = [PortalDto]),
        (status = 401, description = "Login required", body = ApiError)
    ),
    tag = "portals"
)]
pub async fn list_portals(
    State(state): State<AppState>,
) -> Result<Json<Vec<PortalDto>>, ApiError> {
    let portals = PortalRepository::new(state.db.clone()).list().await?;
    Ok(Json(portals.into_iter().map(Into::into).collect()))
}

/// Register a new portal (admin)
#[utoipa::path(
    post,
    path = "/admin/portals",
    request_body = CreatePortalRequestDto,
    responses(
        (status = 201, description = "Portal created", body = PortalDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Login required", body = ApiError),
        (status = 409, description = "Internal id already in use", body = ApiError)
    ),
    tag = "portals"
)]
pub async fn create_portal(
    State(state): State<AppState>,
    Json(request): Json<CreatePortalRequestDto>,
) -> Result<(StatusCode, Json<PortalDto>), ApiError> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("internal_id", &request.internal_id),
        ("name", &request.name),
        ("address_street", &request.address_street),
        ("address_zipcode", &request.address_zipcode),
        ("address_city", &request.address_city),
        ("contractor_company", &request.contractor_company),
        ("contact_phone", &request.contact_phone),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(validation_error(
            "Missing required portal fields",
            serde_json::json!({ "missing": missing }),
        ));
    }

    let installation_date = parse_date(&request.installation_date, "installation_date")?;

    let created = PortalRepository::new(state.db.clone())
        .create(NewPortal {
            internal_id: request.internal_id.trim().to_string(),
            name: request.name.trim().to_string(),
            address_street: request.address_street,
            address_zipcode: request.address_zipcode,
            address_city: request.address_city,
            contractor_company: request.contractor_company,
            contact_phone: request.contact_phone,
            contact_email: request.contact_email.filter(|e| !e.is_empty()),
            installation_date,
        })
        .await
        .map_err(map_portal_write_error)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Portal detail with QR code and intervention history (admin)
#[utoipa::path(
    get,
    path = "/admin/portals/{id}",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    responses(
        (status = 200, description = "Portal detail", body = PortalDetailDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Portal not found", body = ApiError)
    ),
    tag = "portals"
)]
pub async fn get_portal_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PortalDetailDto>, ApiError> {
    let portal_repo = PortalRepository::new(state.db.clone());

    let portal = portal_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found("Portal not found"))?;

    // A portal without a code is a normal state, not an error.
    let qr_code = portal_repo.associated_qr_code(&id).await?;

    let interventions = InterventionRepository::new(state.db.clone())
        .list_for_portal(&id)
        .await?;

    Ok(Json(PortalDetailDto {
        portal: portal.into(),
        qr_code: qr_code.map(Into::into),
        interventions: interventions.into_iter().map(Into::into).collect(),
    }))
}

/// Edit a portal (admin)
#[utoipa::path(
    put,
    path = "/admin/portals/{id}",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    request_body = UpdatePortalRequestDto,
    responses(
        (status = 200, description = "Updated portal", body = PortalDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Portal not found", body = ApiError)
    ),
    tag = "portals"
)]
pub async fn update_portal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePortalRequestDto>,
) -> Result<Json<PortalDto>, ApiError> {
    let installation_date = request
        .installation_date
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| parse_date(v, "installation_date"))
        .transpose()?;

    let update = PortalUpdate {
        name: request.name.filter(|v| !v.is_empty()),
        address_street: request.address_street.filter(|v| !v.is_empty()),
        address_zipcode: request.address_zipcode.filter(|v| !v.is_empty()),
        address_city: request.address_city.filter(|v| !v.is_empty()),
        contractor_company: request.contractor_company.filter(|v| !v.is_empty()),
        contact_phone: request.contact_phone.filter(|v| !v.is_empty()),
        // An empty string clears the optional contact email.
        contact_email: request
            .contact_email
            .map(|v| if v.is_empty() { None } else { Some(v) }),
        installation_date,
    };

    let updated = PortalRepository::new(state.db.clone())
        .update(&id, update)
        .await
        .map_err(map_portal_write_error)?
        .ok_or_else(|| not_found("Portal not found"))?;

    Ok(Json(updated.into()))
}

/// Soft-delete a portal (admin)
#[utoipa::path(
    delete,
    path = "/admin/portals/{id}",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    responses(
        (status = 204, description = "Portal soft-deleted"),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Portal not found", body = ApiError)
    ),
    tag = "portals"
)]
pub async fn delete_portal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = PortalRepository::new(state.db.clone())
        .soft_delete(&id)
        .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Portal not found"))
    }
}

/// Downcasts repository write failures so unique violations surface as 409
/// instead of a generic 500.
fn map_portal_write_error(error: anyhow::Error) -> ApiError {
    match error.downcast::<sea_orm::DbErr>() {
        Ok(db_err) => db_err.into(),
        Err(other) => other.into(),
    }
}
