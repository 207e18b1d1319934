//! Drip Storage - Persistence for the drip campaign service
//!
//! This crate owns the relational schema, the entity models, and the
//! repository abstraction with PostgreSQL and in-memory backends.

pub mod db;
pub mod entity;
pub mod models;
pub mod repository;
pub mod store;

pub use db::DatabasePool;
pub use entity::{Entity, Record};
pub use models::*;
pub use repository::{MemoryStore, PgStore, Repository, StepRepository, UserRepository};
pub use store::Store;
