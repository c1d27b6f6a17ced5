//! # Authentication Handlers
//!
//! Registration, login and logout. Successful login or registration sets
//! the signed session cookie; logout clears it.

use axum::{
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{MIN_PASSWORD_LENGTH, hash_password, verify_password};
use crate::error::{ApiError, conflict, unauthorized, validation_error};
use crate::models::user;
use crate::repositories::{NewUser, UserRepository};
use crate::server::AppState;

/// Request payload for registering a new technician account
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequestDto {
    #[schema(example = "jo.martin@example.com")]
    pub email: String,
    pub password: String,
    #[schema(example = "Jo")]
    pub first_name: String,
    #[schema(example = "Martin")]
    pub last_name: String,
}

/// Request payload for logging in
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequestDto {
    pub email: String,
    pub password: String,
}

/// Authenticated user representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for UserDto {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
        }
    }
}

fn validate_registration(request: &RegisterRequestDto) -> Result<(), ApiError> {
    let mut missing = Vec::new();
    for (field, value) in [
        ("email", &request.email),
        ("password", &request.password),
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(validation_error(
            "All fields are required",
            serde_json::json!({ "missing": missing }),
        ));
    }

    if !request.email.contains('@') {
        return Err(validation_error(
            "Invalid email address",
            serde_json::json!({ "field": "email" }),
        ));
    }

    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(validation_error(
            &format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            serde_json::json!({ "field": "password", "min_length": MIN_PASSWORD_LENGTH }),
        ));
    }

    Ok(())
}

/// Register a new technician account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequestDto,
    responses(
        (status = 201, description = "Account created, session established", body = UserDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequestDto>,
) -> Result<(StatusCode, [(axum::http::HeaderName, String); 1], Json<UserDto>), ApiError> {
    validate_registration(&request)?;

    let repo = UserRepository::new(state.db.clone());

    if repo.find_by_email(request.email.trim()).await?.is_some() {
        return Err(conflict("Email already registered"));
    }

    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Failed to process password",
        )
    })?;

    let created = repo
        .create(NewUser {
            email: request.email.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            password_hash,
        })
        .await?;

    let cookie = state.session_key.session_cookie(created.id, &created.email);
    tracing::info!(user_id = %created.id, "User registered");

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(created.into()),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequestDto,
    responses(
        (status = 200, description = "Session established", body = UserDto),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequestDto>,
) -> Result<([(axum::http::HeaderName, String); 1], Json<UserDto>), ApiError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(validation_error(
            "Email and password are required",
            serde_json::json!({ "fields": ["email", "password"] }),
        ));
    }

    let repo = UserRepository::new(state.db.clone());

    // Same answer whether the account is unknown, inactive, or the password
    // is wrong.
    let user = repo
        .find_active_by_email(&request.email)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid email or password")))?;

    let matches = verify_password(&request.password, &user.password_hash).map_err(|e| {
        tracing::error!(user_id = %user.id, "Password verification failed: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Failed to verify password",
        )
    })?;

    if !matches {
        return Err(unauthorized(Some("Invalid email or password")));
    }

    let cookie = state.session_key.session_cookie(user.id, &user.email);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(([(SET_COOKIE, cookie)], Json(user.into())))
}

/// Log out, clearing the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
) -> (StatusCode, [(axum::http::HeaderName, String); 1]) {
    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, state.session_key.clear_cookie())],
    )
}
