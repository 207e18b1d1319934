//! Settings handlers
//!
//! Settings is a singleton: both operations act on the first live row.
//! `smtp_password` is write-only, so an update that omits it keeps the
//! stored value.

use axum::{body::Bytes, extract::State, Json};
use drip_core::Validate;
use drip_storage::models::Settings;
use drip_storage::Repository;
use std::sync::Arc;
use tracing::info;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::payload::{decode_object, merge_into};

fn settings_not_found() -> ApiError {
    ApiError::NotFound("Settings not found".to_string())
}

/// Get the settings row
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<Settings>, ApiError> {
    let settings = state
        .store
        .settings
        .first()
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to retrieve email settings"))?
        .ok_or_else(settings_not_found)?;

    Ok(Json(settings))
}

/// Update the settings row
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Settings>, ApiError> {
    let existing = state
        .store
        .settings
        .first()
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to update settings"))?
        .ok_or_else(settings_not_found)?;

    let fields = decode_object(&body)?;
    let password_given = fields.contains_key("smtp_password");
    let mut settings: Settings = merge_into(&existing, fields, &[])?;
    if !password_given {
        settings.smtp_password = existing.smtp_password;
    }
    settings
        .validate()
        .map_err(|e| ApiError::from_error(e, "Failed to update settings"))?;

    let updated = state
        .store
        .settings
        .update(settings)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to update settings"))?
        .ok_or_else(settings_not_found)?;

    info!("Updated settings {}", updated.record.id);
    Ok(Json(updated))
}
