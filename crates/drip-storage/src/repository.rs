//! Repository layer for data access

pub mod memory;
pub mod postgres;
pub mod steps;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use steps::StepRepository;

use crate::models::User;
use async_trait::async_trait;
use drip_common::types::Id;
use drip_common::Result;

/// CRUD contract shared by every entity
///
/// Soft-deleted rows are invisible to every method: reads skip them,
/// updates and deletes treat them as missing.
#[async_trait]
pub trait Repository<T: Send + Sync + 'static>: Send + Sync {
    /// Insert a row; the store assigns the id and timestamps
    async fn create(&self, entity: T) -> Result<T>;

    /// All live rows, ordered by id
    async fn list(&self) -> Result<Vec<T>>;

    async fn get(&self, id: Id) -> Result<Option<T>>;

    /// Live row with the lowest id
    async fn first(&self) -> Result<Option<T>>;

    /// Replace the row identified by the entity's id; `None` if it is not live
    async fn update(&self, entity: T) -> Result<Option<T>>;

    /// Soft-delete a row; `false` if it was not live
    async fn delete(&self, id: Id) -> Result<bool>;
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}
