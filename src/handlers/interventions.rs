//! # Intervention Handlers
//!
//! Recording maintenance visits against a portal, reading them back, and
//! the report surface (PDF download plus email delivery).

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, not_found, unauthorized};
use crate::handlers::parse_date;
use crate::models::control::{self, ControlType};
use crate::models::intervention;
use crate::repositories::{
    InterventionRepository, NewIntervention, PortalRepository, UserRepository,
};
use crate::reports::ReportService;
use crate::server::AppState;

/// One recorded checklist item
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ControlDto {
    #[schema(example = "warning_lights")]
    pub kind: ControlType,
    /// Pass (`true`) / fail (`false`); null when recorded without verdict
    pub result: Option<bool>,
}

impl From<control::Model> for ControlDto {
    fn from(model: control::Model) -> Self {
        Self {
            kind: model.kind,
            result: model.result,
        }
    }
}

/// Intervention representation including its controls
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InterventionDto {
    pub id: Uuid,
    #[schema(example = "2025-03-14")]
    pub date: String,
    pub summary: Option<String>,
    pub user_id: Uuid,
    /// Technician display name as it was at recording time
    pub user_name: String,
    pub portal_id: Uuid,
    pub controls: Vec<ControlDto>,
}

impl From<(intervention::Model, Vec<control::Model>)> for InterventionDto {
    fn from((model, controls): (intervention::Model, Vec<control::Model>)) -> Self {
        Self {
            id: model.id,
            date: model.date.format("%Y-%m-%d").to_string(),
            summary: model.summary,
            user_id: model.user_id,
            user_name: model.user_name,
            portal_id: model.portal_id,
            controls: controls.into_iter().map(Into::into).collect(),
        }
    }
}

/// Request payload for recording an intervention.
///
/// `controls` maps control-type names to the technician's explicit
/// selections; absent keys and explicit nulls both mean "not inspected" and
/// persist no row.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInterventionRequestDto {
    #[schema(example = "2025-03-14")]
    pub date: String,
    pub summary: Option<String>,
    #[serde(default)]
    #[schema(example = json!({"warning_lights": true, "apron_condition": false}))]
    pub controls: BTreeMap<String, Option<bool>>,
}

/// Response payload for a recorded intervention
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateInterventionResponseDto {
    pub id: Uuid,
}

fn report_service(state: &AppState) -> ReportService {
    ReportService::new(
        state.gotenberg.clone(),
        state.mailer.clone(),
        InterventionRepository::new(state.db.clone()),
        PortalRepository::new(state.db.clone()),
        UserRepository::new(state.db.clone()),
    )
}

/// Record a maintenance intervention for a portal (admin)
#[utoipa::path(
    post,
    path = "/admin/portals/{id}/interventions",
    params(("id" = Uuid, Path, description = "Portal UUID")),
    request_body = CreateInterventionRequestDto,
    responses(
        (status = 201, description = "Intervention recorded", body = CreateInterventionResponseDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Portal not found", body = ApiError)
    ),
    tag = "interventions"
)]
pub async fn create_intervention(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(portal_id): Path<Uuid>,
    Json(request): Json<CreateInterventionRequestDto>,
) -> Result<(StatusCode, Json<CreateInterventionResponseDto>), ApiError> {
    let date = parse_date(&request.date, "date")?;

    // The session only carries the identity; the snapshot name comes from
    // the user row as it is right now.
    let user = UserRepository::new(state.db.clone())
        .find_by_id(&session.user_id)
        .await?
        .ok_or_else(|| unauthorized(Some("Unknown session user")))?;

    let id = InterventionRepository::new(state.db.clone())
        .record(
            &user,
            NewIntervention {
                portal_id,
                date,
                summary: request.summary,
                controls: request.controls,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInterventionResponseDto { id }),
    ))
}

/// Fetch an intervention with its controls (admin)
#[utoipa::path(
    get,
    path = "/admin/interventions/{id}",
    params(("id" = Uuid, Path, description = "Intervention UUID")),
    responses(
        (status = 200, description = "Intervention", body = InterventionDto),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Intervention not found", body = ApiError)
    ),
    tag = "interventions"
)]
pub async fn get_intervention(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterventionDto>, ApiError> {
    let found = InterventionRepository::new(state.db.clone())
        .find_with_controls(&id)
        .await?
        .ok_or_else(|| not_found("Intervention not found"))?;

    Ok(Json(found.into()))
}

/// Soft-delete an intervention and its controls (admin)
#[utoipa::path(
    delete,
    path = "/admin/interventions/{id}",
    params(("id" = Uuid, Path, description = "Intervention UUID")),
    responses(
        (status = 204, description = "Intervention soft-deleted"),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Intervention not found", body = ApiError)
    ),
    tag = "interventions"
)]
pub async fn delete_intervention(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = InterventionRepository::new(state.db.clone())
        .soft_delete(&id)
        .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Intervention not found"))
    }
}

/// Download the intervention report as PDF (admin)
#[utoipa::path(
    get,
    path = "/admin/interventions/{id}/report",
    params(("id" = Uuid, Path, description = "Intervention UUID")),
    responses(
        (status = 200, description = "PDF report", body = Vec<u8>, content_type = "application/pdf"),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Intervention not found", body = ApiError),
        (status = 502, description = "PDF conversion failed", body = ApiError)
    ),
    tag = "interventions"
)]
pub async fn get_report_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf = report_service(&state).generate_pdf(&id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"rapport_intervention_{}.pdf\"", id),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Email the intervention report to the technician (admin)
#[utoipa::path(
    post,
    path = "/admin/interventions/{id}/report/send",
    params(("id" = Uuid, Path, description = "Intervention UUID")),
    responses(
        (status = 200, description = "Report emailed"),
        (status = 401, description = "Login required", body = ApiError),
        (status = 404, description = "Intervention not found", body = ApiError),
        (status = 502, description = "PDF conversion or email delivery failed", body = ApiError)
    ),
    tag = "interventions"
)]
pub async fn send_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    report_service(&state).send_report(&id).await?;

    Ok(Json(serde_json::json!({ "status": "sent" })))
}
