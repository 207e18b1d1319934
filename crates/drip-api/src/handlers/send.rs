//! Send email handler

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use drip_common::types::EmailAddress;
use drip_core::{Mailer, OutgoingEmail, SenderAccount};
use drip_storage::models::EmailLog;
use drip_storage::Repository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::auth::AppState;
use crate::error::{ApiError, MessageResponse};
use crate::payload::decode;

/// Send email request
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Send one email immediately using the credentials from settings
///
/// A successful send is recorded as an email log entry; failures leave no trace.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: SendEmailRequest = decode(&body)?;

    if EmailAddress::parse(&request.to).is_none() {
        return Err(ApiError::BadRequest("Invalid recipient address".to_string()));
    }

    let settings = state
        .store
        .settings
        .first()
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to retrieve email settings"))?
        .ok_or_else(|| ApiError::NotFound("Settings not found".to_string()))?;

    let sender = SenderAccount {
        email: settings.smtp_email,
        password: settings.smtp_password,
    };
    let email = OutgoingEmail {
        to: request.to,
        subject: request.subject,
        body: request.body,
    };

    state.mailer.send(&sender, &email).await.map_err(|e| {
        error!("Failed to send email to {}: {}", email.to, e);
        ApiError::Internal("Failed to send email".to_string())
    })?;

    info!("Sent email to {}", email.to);

    let log = EmailLog {
        recipient: email.to,
        subject: email.subject,
        body: email.body,
        sent_at: Some(Utc::now()),
        status: "sent".to_string(),
        ..Default::default()
    };
    if let Err(e) = state.store.email_logs.create(log).await {
        error!("Failed to record email log: {}", e);
    }

    Ok(Json(MessageResponse::new("Email sent successfully")))
}
