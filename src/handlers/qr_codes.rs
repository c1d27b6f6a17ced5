//! # QR Code Handlers
//!
//! The sticker-scan redirect entry point plus the admin association
//! lifecycle: associate, unassociate (code reusable), mark lost (code
//! retired) and mark damaged.

use axum::{
    extract::{Path, State},
    response::{Json, Redirect},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, not_found};
use crate::models::qr_code::{self, QrCodeStatus};
use crate::repositories::QrCodeRepository;
use crate::server::AppState;

/// QR code representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrCodeDto {
    /// Sticker UUID, as printed on the physical sticker
    pub id: Uuid,
    pub portal_id: Option<Uuid>,
    #[schema(example = "available")]
    pub status: QrCodeStatus,
    pub associated_at: Option<String>,
    pub generated_at: String,
}

impl From<qr_code::Model> for QrCodeDto {
    fn from(model: qr_code::Model) -> Self {
        Self {
            id: model.id,
            portal_id: model.portal_id,
            status: model.status,
            associated_at: model.associated_at.map(|t| t.to_rfc3339()),
            generated_at: model.generated_at.to_rfc3339(),
        }
    }
}

/// Request payload for associating a QR code with a portal
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssociateRequestDto {
    /// UUID of an available sticker
    pub qr_code_uuid: Uuid,
}

/// Redirect a scanned sticker to its portal page
#[utoipa::path(
    get,
    path = "/qr/{id}",
    params(("id" = Uuid, Path, description = "Sticker UUID")),
    responses(
        (status = 303, description = "Redirect to the associated portal"),
        (status = 404, description = "QR code not found or not associated", body = ApiError)
    ),
    tag = "qr-codes"
)]
pub async fn qr_redirect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let portal_id = QrCodeRepository::new(state.db.clone())
        .resolve_portal(&id)
        .await
        .map_err(|e| match e {
            crate::repositories::AssociationError::Db(db_err) => db_err.into(),
            _ => not_found("QR code not found or not associated"),
        })?;

    Ok(Redirect::to(&format!("/portals/{}", portal_id)))
}

/// Scan-utility lookup of a sticker's current state (admin)
#[utoipa::path(
    get,
    path = "/admin/qr-codes/{id}",
    params(("id" = Uuid, Path, description = "Sticker UUID")),
    responses(
        (status = 200, description = "QR code", body = QrCodeDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "QR code not found", body = ApiError)
    ),
    tag = "qr-codes"
)]
pub async fn get_qr_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QrCodeDto>, ApiError> {
    let code = QrCodeRepository::new(state.db.clone())
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found("QR code not found"))?;

    Ok(Json(code.into()))
}

/// Associate an available QR code with a portal (admin)
#[utoipa::path(
    post,
    path = "/admin/portals/{id}/qr-code",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    request_body = AssociateRequestDto,
    responses(
        (status = 200, description = "QR code associated", body = QrCodeDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Portal or QR code not found / not available", body = ApiError),
        (status = 409, description = "Portal already has an associated QR code", body = ApiError)
    ),
    tag = "qr-codes"
)]
pub async fn associate(
    State(state): State<AppState>,
    Path(portal_id): Path<Uuid>,
    Json(request): Json<AssociateRequestDto>,
) -> Result<Json<QrCodeDto>, ApiError> {
    let code = QrCodeRepository::new(state.db.clone())
        .associate(&portal_id, &request.qr_code_uuid)
        .await?;

    Ok(Json(code.into()))
}

/// Detach the portal's QR code and make it reusable (admin)
#[utoipa::path(
    delete,
    path = "/admin/portals/{id}/qr-code",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    responses(
        (status = 200, description = "QR code released back to available", body = QrCodeDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "No associated QR code", body = ApiError)
    ),
    tag = "qr-codes"
)]
pub async fn unassociate(
    State(state): State<AppState>,
    Path(portal_id): Path<Uuid>,
) -> Result<Json<QrCodeDto>, ApiError> {
    let code = QrCodeRepository::new(state.db.clone())
        .unassociate(&portal_id)
        .await?;

    Ok(Json(code.into()))
}

/// Detach the portal's QR code and retire it as lost (admin)
#[utoipa::path(
    post,
    path = "/admin/portals/{id}/qr-code/lost",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    responses(
        (status = 200, description = "QR code retired as lost", body = QrCodeDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "No associated QR code", body = ApiError)
    ),
    tag = "qr-codes"
)]
pub async fn mark_lost(
    State(state): State<AppState>,
    Path(portal_id): Path<Uuid>,
) -> Result<Json<QrCodeDto>, ApiError> {
    let code = QrCodeRepository::new(state.db.clone())
        .mark_lost(&portal_id)
        .await?;

    Ok(Json(code.into()))
}

/// Retire an available sticker as physically damaged (admin)
#[utoipa::path(
    post,
    path = "/admin/qr-codes/{id}/damaged",
    params(("id" = Uuid, Path, description = "Sticker UUID")),
    responses(
        (status = 200, description = "QR code retired as damaged", body = QrCodeDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "QR code not found or not available", body = ApiError)
    ),
    tag = "qr-codes"
)]
pub async fn mark_damaged(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QrCodeDto>, ApiError> {
    let code = QrCodeRepository::new(state.db.clone())
        .mark_damaged(&id)
        .await?;

    Ok(Json(code.into()))
}
