//! Record store client: CRUD over the catalogue collection.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{DbErr, RuntimeErr, sqlx};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use memory::MemoryRecordStore;
pub use postgres::SeaOrmRecordStore;

use crate::entity::record;

/// A catalogue record as persisted by the store.
pub type Record = record::Model;

/// Upper bound on records returned by a single list call.
pub const MAX_LIST_LIMIT: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record not found")]
    NotFound,
    /// The record changed between read and conditional write.
    #[error("record was modified concurrently")]
    WriteConflict,
    #[error("database error: {0}")]
    Database(DbErr),
}

impl RecordStoreError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict)
    }
}

impl From<DbErr> for RecordStoreError {
    fn from(err: DbErr) -> Self {
        if is_serialization_failure(&err) {
            RecordStoreError::WriteConflict
        } else {
            RecordStoreError::Database(err)
        }
    }
}

/// SQLSTATEs Postgres uses for serialization failures and deadlocks; both
/// are safe to retry.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// Only an error reported by the database itself carries a SQLSTATE.
/// Connection and driver errors never count as conflicts.
fn is_serialization_failure(err: &DbErr) -> bool {
    let (DbErr::Exec(RuntimeErr::SqlxError(source)) | DbErr::Query(RuntimeErr::SqlxError(source))) =
        err
    else {
        return false;
    };
    let source: &sqlx::Error = source;
    source
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code.as_ref()))
}

/// Current time at the microsecond precision Postgres stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fields for a new record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecord {
    pub fields: Map<String, Value>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
}

impl NewRecord {
    pub(crate) fn into_model(self, id: Uuid) -> Record {
        let now = now();
        Record {
            id,
            fields: Value::Object(self.fields),
            image_url: self.image_url,
            image_path: self.image_path,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a record.
///
/// * `fields`: merged key by key; a JSON `null` removes the key.
/// * `image_url` / `image_path`: `None` leaves the column alone,
///   `Some(None)` clears it, `Some(Some(v))` replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChanges {
    pub fields: Map<String, Value>,
    pub image_url: Option<Option<String>>,
    pub image_path: Option<Option<String>>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.image_url.is_none() && self.image_path.is_none()
    }

    /// Produce the next revision of `current`. Bumps `version` and `updated_at`.
    pub fn apply(&self, current: &Record) -> Record {
        let mut fields = match &current.fields {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for (key, value) in &self.fields {
            if value.is_null() {
                fields.remove(key);
            } else {
                fields.insert(key.clone(), value.clone());
            }
        }

        let mut next = current.clone();
        next.fields = Value::Object(fields);
        if let Some(url) = &self.image_url {
            next.image_url = url.clone();
        }
        if let Some(path) = &self.image_path {
            next.image_path = path.clone();
        }
        next.version = current.version.wrapping_add(1);
        next.updated_at = now();
        next
    }
}

/// Storage for catalogue records.
///
/// Implementations must make `update` a conditional write on `version` and
/// report a lost race as [`RecordStoreError::WriteConflict`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Newest first by creation time, at most `limit` (capped at
    /// [`MAX_LIST_LIMIT`]).
    async fn list(&self, limit: u64) -> Result<Vec<Record>, RecordStoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Record>, RecordStoreError>;

    async fn create(&self, new: NewRecord) -> Result<Record, RecordStoreError>;

    async fn update(&self, id: Uuid, changes: &RecordChanges) -> Result<Record, RecordStoreError>;

    /// Returns `false` if no record had this id.
    async fn delete(&self, id: Uuid) -> Result<bool, RecordStoreError>;
}
