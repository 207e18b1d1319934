//! API request handlers

pub mod auth;
pub mod crud;
pub mod health;
pub mod send;
pub mod settings;
pub mod users;

pub use health::*;
