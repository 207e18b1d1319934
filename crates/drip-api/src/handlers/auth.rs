//! Login handler

use axum::{body::Bytes, extract::State, Json};
use drip_core::credentials::{verify_absent, verify_password};
use drip_storage::repository::UserRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::payload::decode;

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let request: LoginRequest = decode(&body)?;

    let found = state
        .store
        .users
        .find_by_email(&request.email)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to log in"))?;

    let Some(user) = found else {
        verify_absent(&request.password);
        warn!("Login attempt for unknown account");
        return Err(invalid_credentials());
    };

    if !verify_password(&request.password, &user.password_hash) {
        warn!("Login attempt with wrong password for user {}", user.record.id);
        return Err(invalid_credentials());
    }

    let role = user.role().ok_or_else(|| {
        error!("User {} has unknown role {:?}", user.record.id, user.role);
        ApiError::Internal("Failed to generate token".to_string())
    })?;

    let token = state
        .tokens
        .issue(user.record.id, &user.email, role)
        .map_err(|e| ApiError::from_error(e, "Failed to generate token"))?;

    info!("User {} logged in as {}", user.record.id, role);
    Ok(Json(LoginResponse { token }))
}
