//! Drip API - REST API server
//!
//! This crate provides the HTTP surface of the drip campaign service:
//! login, the role gate, entity CRUD, settings and one-shot email sends.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod payload;
pub mod routes;

pub use auth::AppState;
pub use error::ApiError;
pub use routes::create_router;
