//! PostgreSQL repository shared by every entity

use super::{Repository, UserRepository};
use crate::db::DatabasePool;
use crate::entity::Entity;
use crate::models::User;
use async_trait::async_trait;
use drip_common::types::Id;
use drip_common::{Error, Result};
use std::marker::PhantomData;
use tracing::debug;

/// Predicate that hides soft-deleted rows
const LIVE: &str = "deleted_at IS NULL";

/// Database repository for one entity table
pub struct PgStore<T> {
    pool: DatabasePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> PgStore<T> {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

fn quote(column: &str) -> String {
    format!("\"{}\"", column)
}

fn select_sql<T: Entity>() -> String {
    format!("SELECT * FROM {} WHERE {}", T::TABLE, LIVE)
}

fn insert_sql<T: Entity>() -> String {
    let columns: Vec<String> = T::COLUMNS.iter().map(|c| quote(c)).collect();
    let params: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("${}", i)).collect();

    format!(
        "INSERT INTO {} ({}, created_at, updated_at) VALUES ({}, NOW(), NOW()) RETURNING *",
        T::TABLE,
        columns.join(", "),
        params.join(", ")
    )
}

fn update_sql<T: Entity>() -> String {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", quote(c), i + 2))
        .collect();

    format!(
        "UPDATE {} SET {}, updated_at = NOW() WHERE id = $1 AND {} RETURNING *",
        T::TABLE,
        assignments.join(", "),
        LIVE
    )
}

fn delete_sql<T: Entity>() -> String {
    format!(
        "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND {}",
        T::TABLE,
        LIVE
    )
}

/// Map a driver error onto the service taxonomy
pub(crate) fn db_error(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            debug!("Unique violation: {}", db.message());
            return Error::Conflict("Record already exists".to_string());
        }
        if db.is_foreign_key_violation() {
            debug!("Foreign key violation: {}", db.message());
            return Error::Validation("Referenced record does not exist".to_string());
        }
    }
    Error::Database(e.to_string())
}

#[async_trait]
impl<T: Entity> Repository<T> for PgStore<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let sql = insert_sql::<T>();
        entity
            .bind_columns(sqlx::query_as::<_, T>(&sql))
            .fetch_one(self.pool.pool())
            .await
            .map_err(db_error)
    }

    async fn list(&self) -> Result<Vec<T>> {
        let sql = format!("{} ORDER BY id", select_sql::<T>());
        sqlx::query_as::<_, T>(&sql)
            .fetch_all(self.pool.pool())
            .await
            .map_err(db_error)
    }

    async fn get(&self, id: Id) -> Result<Option<T>> {
        let sql = format!("{} AND id = $1", select_sql::<T>());
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_error)
    }

    async fn first(&self) -> Result<Option<T>> {
        let sql = format!("{} ORDER BY id LIMIT 1", select_sql::<T>());
        sqlx::query_as::<_, T>(&sql)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_error)
    }

    async fn update(&self, entity: T) -> Result<Option<T>> {
        let sql = update_sql::<T>();
        let query = sqlx::query_as::<_, T>(&sql).bind(entity.record().id);
        entity
            .bind_columns(query)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_error)
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        let sql = delete_sql::<T>();
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore<User> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("{} AND email = $1", select_sql::<User>());
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_error)
    }
}
