//! Drip Common - Shared types and utilities
//!
//! This crate provides configuration, the error taxonomy and the small
//! shared types used by every layer of the drip campaign service.

pub mod config;
pub mod error;
pub mod types;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::types::{EmailAddress, Role};
