//! User administration handlers (admin only)

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use drip_common::types::{EmailAddress, Role};
use drip_core::credentials::hash_password;
use drip_storage::models::User;
use drip_storage::repository::Repository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::crud::parse_id;
use crate::auth::AppState;
use crate::error::{ApiError, MessageResponse};
use crate::payload::decode;

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Update user request; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// Account emails are either an address or a bare login such as "admin"
fn check_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if email.contains('@') && EmailAddress::parse(email).is_none() {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    Ok(())
}

async fn find_user(state: &AppState, raw_id: &str, action: &str) -> Result<User, ApiError> {
    state
        .store
        .users
        .get(parse_id(raw_id))
        .await
        .map_err(|e| ApiError::from_error(e, &format!("Failed to {} user", action)))?
        .ok_or_else(user_not_found)
}

/// List users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .store
        .users
        .list()
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to retrieve users"))?;

    Ok(Json(users))
}

/// Get a user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(find_user(&state, &id, "retrieve").await?))
}

/// Create a user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let request: CreateUserRequest = decode(&body)?;
    check_email(&request.email)?;
    check_password(&request.password)?;

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::from_error(e, "Failed to create user"))?;

    let user = state
        .store
        .users
        .create(User {
            email: request.email.trim().to_string(),
            password_hash,
            role: request.role.unwrap_or(Role::User).to_string(),
            ..Default::default()
        })
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to create user"))?;

    info!("Created user {} with role {}", user.record.id, user.role);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a user
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    let mut user = find_user(&state, &id, "update").await?;
    let request: UpdateUserRequest = decode(&body)?;

    if let Some(email) = request.email {
        check_email(&email)?;
        user.email = email.trim().to_string();
    }
    if let Some(password) = request.password {
        check_password(&password)?;
        user.password_hash = hash_password(&password)
            .map_err(|e| ApiError::from_error(e, "Failed to update user"))?;
    }
    if let Some(role) = request.role {
        user.role = role.to_string();
    }

    let updated = state
        .store
        .users
        .update(user)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to update user"))?
        .ok_or_else(user_not_found)?;

    info!("Updated user {}", updated.record.id);
    Ok(Json(updated))
}

/// Delete a user
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = find_user(&state, &id, "delete").await?;

    let deleted = state
        .store
        .users
        .delete(user.record.id)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to delete user"))?;
    if !deleted {
        return Err(user_not_found());
    }

    info!("Deleted user {}", user.record.id);
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
