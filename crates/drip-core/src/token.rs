//! Session tokens
//!
//! Tokens are HS256 JWTs carrying the user id, email and role. Route groups
//! are gated hierarchically: admin satisfies every requirement.

use chrono::{Duration, Utc};
use drip_common::config::AuthConfig;
use drip_common::types::{Id, Role};
use drip_common::{Error, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Id,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Why a token was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Insufficient permissions")]
    InsufficientRole,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, Duration::hours(config.token_ttl_hours))
    }

    /// Issue a token for a user
    pub fn issue(&self, user_id: Id, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry
    pub fn validate(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Validate a token and check it grants `required`
    pub fn authorize(&self, token: &str, required: Role) -> std::result::Result<Claims, TokenError> {
        let claims = self.validate(token)?;
        authorize(&claims, required)?;
        Ok(claims)
    }
}

/// Single route policy: the holder's role must satisfy the route's role
pub fn authorize(claims: &Claims, required: Role) -> std::result::Result<(), TokenError> {
    if claims.role.satisfies(required) {
        Ok(())
    } else {
        Err(TokenError::InsufficientRole)
    }
}
