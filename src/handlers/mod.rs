//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the portal
//! maintenance API.

pub mod auth;
pub mod interventions;
pub mod portals;
pub mod qr_codes;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health check verifying database connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    db_health(&state).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn db_health(state: &AppState) -> Result<(), ApiError> {
    crate::db::health_check(&state.db).await.map_err(|e| {
        tracing::error!("Health check failed: {:?}", e);
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database unreachable",
        )
    })?;
    Ok(())
}

/// Parses a `YYYY-MM-DD` date field, rejecting anything else.
pub(crate) fn parse_date(value: &str, field: &str) -> Result<chrono::NaiveDate, ApiError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        crate::error::validation_error(
            &format!("Invalid {field} format, expected YYYY-MM-DD"),
            json!({ "field": field, "value": value }),
        )
    })
}
