//! Persistence of bag metadata records.

mod sea;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::{BagId, FileId, HashAlgorithm};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

pub use sea::SeaOrmBagStore;

/// Metadata row describing one bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BagRecord {
    /// Persistence identity of the row.
    pub id: i32,
    pub file_id: FileId,
    pub bag_id: BagId,
    pub user_id: String,
    pub hash_type: HashAlgorithm,
    pub hash_value: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A record that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewBagRecord {
    pub file_id: FileId,
    pub bag_id: BagId,
    pub user_id: String,
    pub hash_type: HashAlgorithm,
    pub hash_value: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique lookup found no rows, or a write touched none.
    #[error("bag record not found: {0}")]
    NotFound(String),

    /// A unique lookup found more than one row.
    #[error("{count} bag records match {key}")]
    Ambiguous { key: String, count: usize },

    /// A persisted row cannot be mapped back onto a record.
    #[error("corrupt bag record {id}: {reason}")]
    Corrupt { id: i32, reason: String },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Record store consumed by the lifecycle manager.
#[async_trait]
pub trait BagRecordStore: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    async fn insert(&self, record: NewBagRecord) -> StoreResult<BagRecord>;

    /// Overwrite every field of an existing record.
    async fn update(&self, record: &BagRecord) -> StoreResult<BagRecord>;

    async fn delete(&self, record: &BagRecord) -> StoreResult<()>;

    /// Remove several records. Implementations backed by a database do so
    /// atomically.
    async fn delete_many(&self, records: &[BagRecord]) -> StoreResult<u64> {
        for record in records {
            self.delete(record).await?;
        }
        Ok(records.len() as u64)
    }

    async fn find_all(&self, user_id: &str) -> StoreResult<Vec<BagRecord>>;

    async fn find_by_bag_id(&self, bag_id: BagId, user_id: &str) -> StoreResult<Vec<BagRecord>>;

    async fn find_by_file_id(&self, file_id: FileId, user_id: &str)
    -> StoreResult<Vec<BagRecord>>;

    /// The single record for `(file_id, user_id)`.
    async fn find_one_by_file_id(&self, file_id: FileId, user_id: &str) -> StoreResult<BagRecord> {
        let records = self.find_by_file_id(file_id, user_id).await?;
        exactly_one(records, || format!("file {file_id} of user {user_id}"))
    }
}

/// Collapse a result set that must contain exactly one record.
pub fn exactly_one(
    mut records: Vec<BagRecord>,
    key: impl FnOnce() -> String,
) -> StoreResult<BagRecord> {
    match records.len() {
        0 => Err(StoreError::NotFound(key())),
        1 => Ok(records.remove(0)),
        count => Err(StoreError::Ambiguous { key: key(), count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i32) -> BagRecord {
        let now = Utc::now();
        BagRecord {
            id,
            file_id: FileId(42),
            bag_id: BagId::new(),
            user_id: "alice".into(),
            hash_type: HashAlgorithm::Md5,
            hash_value: "abc".into(),
            created: now,
            updated: now,
        }
    }

    #[test]
    fn exactly_one_returns_single_record() {
        let only = record(1);
        let found = exactly_one(vec![only.clone()], || "k".into()).unwrap();
        assert_eq!(found, only);
    }

    #[test]
    fn exactly_one_reports_missing() {
        let err = exactly_one(vec![], || "file 42".into()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(key) if key == "file 42"));
    }

    #[test]
    fn exactly_one_reports_ambiguity() {
        let err = exactly_one(vec![record(1), record(2)], || "file 42".into()).unwrap_err();
        assert!(matches!(err, StoreError::Ambiguous { count: 2, .. }));
        assert_eq!(err.to_string(), "2 bag records match file 42");
    }
}
