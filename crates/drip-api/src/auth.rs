//! Authentication module

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use drip_common::types::Role;
use drip_core::{Mailer, TokenError, TokenIssuer};
use drip_storage::Store;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenIssuer,
    pub mailer: Arc<dyn Mailer>,
}

/// Extract the session token from the Authorization header
///
/// Accepts `Bearer <token>` or the bare token.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Middleware for routes open to any signed-in user
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, request, next, Role::User).await
}

/// Middleware for admin-only routes
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, request, next, Role::Admin).await
}

async fn authorize(
    state: &AppState,
    mut request: Request,
    next: Next,
    required: Role,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    let token = extract_token(request.headers()).ok_or_else(|| {
        warn!("Missing authorization header in request to {}", path);
        ApiError::Unauthorized("Authorization header required".to_string())
    })?;

    let claims = state.tokens.authorize(token, required).map_err(|e| match e {
        TokenError::InsufficientRole => {
            warn!("Role check failed for {} ({} required)", path, required);
            ApiError::Forbidden("Insufficient permissions".to_string())
        }
        TokenError::Invalid | TokenError::Expired => {
            warn!("Rejected token for {}: {}", path, e);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        }
    })?;

    debug!("User {} authorized for {}", claims.sub, path);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
