//! Common record fields and the entity abstraction shared by every table

use chrono::{DateTime, Utc};
use drip_common::types::Id;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};

/// Query type produced while binding an entity's column values
pub type PgQueryAs<'q, T> = QueryAs<'q, Postgres, T, PgArguments>;

/// Base fields carried by every row
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Whether the row has not been soft-deleted
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A persisted entity
///
/// Implementors describe their table and writable columns once; both store
/// backends derive the whole CRUD contract from that description.
pub trait Entity:
    for<'r> FromRow<'r, PgRow>
    + Serialize
    + DeserializeOwned
    + Default
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// Table name
    const TABLE: &'static str;

    /// Writable columns, in the order `bind_columns` binds them
    const COLUMNS: &'static [&'static str];

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Bind the values of `COLUMNS` onto a query
    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self>;

    /// Key that must be unique among live rows, if any
    fn unique_key(&self) -> Option<String> {
        None
    }
}
