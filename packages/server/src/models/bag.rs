use chrono::{DateTime, Utc};
use common::storage::{BagId, ContentEntry, FileId, HashAlgorithm, StorageRoot};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::service::{BagSummary, Validation};
use crate::store::BagRecord;

/// Request body for bagging a file.
#[derive(Deserialize)]
pub struct CreateBagRequest {
    /// Numeric id of the source file or folder.
    pub file_id: i64,
    /// Digest algorithm name; the configured default when absent.
    pub hash_type: Option<String>,
}

impl CreateBagRequest {
    pub fn algorithm(&self) -> Result<Option<HashAlgorithm>, AppError> {
        self.hash_type
            .as_deref()
            .map(|name| {
                name.parse()
                    .map_err(|_| AppError::Validation(format!("Unsupported hash type '{name}'")))
            })
            .transpose()
    }
}

/// Response DTO for a single bag record.
#[derive(Debug, Serialize)]
pub struct BagResponse {
    pub id: i32,
    pub file_id: FileId,
    pub bag_id: BagId,
    pub hash_type: HashAlgorithm,
    pub hash_value: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<BagRecord> for BagResponse {
    fn from(record: BagRecord) -> Self {
        Self {
            id: record.id,
            file_id: record.file_id,
            bag_id: record.bag_id,
            hash_type: record.hash_type,
            hash_value: record.hash_value,
            created: record.created,
            updated: record.updated,
        }
    }
}

/// Response DTO for lookups that may match several records.
#[derive(Serialize)]
pub struct BagRecordListResponse {
    pub records: Vec<BagResponse>,
    pub total: usize,
}

impl From<Vec<BagRecord>> for BagRecordListResponse {
    fn from(records: Vec<BagRecord>) -> Self {
        let records: Vec<BagResponse> = records.into_iter().map(Into::into).collect();
        Self {
            total: records.len(),
            records,
        }
    }
}

/// Response DTO for listing a user's bags.
#[derive(Serialize)]
pub struct BagListResponse {
    pub bags: Vec<BagSummary>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct BagContentResponse {
    pub file_id: FileId,
    pub entries: Vec<ContentEntry>,
}

#[derive(Serialize)]
pub struct StorageSummaryResponse {
    pub name: String,
    pub size: u64,
    pub bags: usize,
}

impl From<StorageRoot> for StorageSummaryResponse {
    fn from(root: StorageRoot) -> Self {
        Self {
            name: root.name,
            size: root.size,
            bags: root.bags,
        }
    }
}

/// Outcome of an integrity check. `expected`/`actual` are set on mismatch.
#[derive(Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub bag: BagResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl From<Validation> for ValidationResponse {
    fn from(outcome: Validation) -> Self {
        match outcome {
            Validation::Valid(record) => Self {
                valid: true,
                bag: record.into(),
                expected: None,
                actual: None,
            },
            Validation::Mismatch {
                record,
                expected,
                actual,
            } => Self {
                valid: false,
                bag: record.into(),
                expected: Some(expected),
                actual: Some(actual),
            },
        }
    }
}
