//! In-process repository used by the `memory` backend and in tests

use super::{Repository, UserRepository};
use crate::entity::Entity;
use crate::models::User;
use async_trait::async_trait;
use chrono::Utc;
use drip_common::types::Id;
use drip_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Memory repository for one entity type
pub struct MemoryStore<T> {
    rows: RwLock<BTreeMap<Id, T>>,
    next_id: AtomicI64,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject a row whose unique key is already held by another live row
fn check_unique<T: Entity>(rows: &BTreeMap<Id, T>, entity: &T) -> Result<()> {
    let Some(key) = entity.unique_key() else {
        return Ok(());
    };

    let taken = rows.values().any(|row| {
        row.record().is_live()
            && row.record().id != entity.record().id
            && row.unique_key().as_deref() == Some(key.as_str())
    });

    if taken {
        debug!("Duplicate key {} in {}", key, T::TABLE);
        return Err(Error::Conflict("Record already exists".to_string()));
    }
    Ok(())
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryStore<T> {
    async fn create(&self, mut entity: T) -> Result<T> {
        let mut rows = self.rows.write().await;

        entity.record_mut().id = 0;
        check_unique(&rows, &entity)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let record = entity.record_mut();
        record.id = id;
        record.created_at = now;
        record.updated_at = now;
        record.deleted_at = None;

        rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn list(&self) -> Result<Vec<T>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| row.record().is_live())
            .cloned()
            .collect())
    }

    async fn get(&self, id: Id) -> Result<Option<T>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).filter(|row| row.record().is_live()).cloned())
    }

    async fn first(&self) -> Result<Option<T>> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|row| row.record().is_live()).cloned())
    }

    async fn update(&self, mut entity: T) -> Result<Option<T>> {
        let mut rows = self.rows.write().await;
        let id = entity.record().id;

        let created_at = match rows.get(&id) {
            Some(existing) if existing.record().is_live() => existing.record().created_at,
            _ => return Ok(None),
        };
        check_unique(&rows, &entity)?;

        let record = entity.record_mut();
        record.created_at = created_at;
        record.updated_at = Utc::now();
        record.deleted_at = None;

        rows.insert(id, entity.clone());
        Ok(Some(entity))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(row) if row.record().is_live() => {
                let now = Utc::now();
                let record = row.record_mut();
                record.deleted_at = Some(now);
                record.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore<User> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|user| user.record.is_live() && user.email == email)
            .cloned())
    }
}
