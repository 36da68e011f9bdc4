//! Bag lifecycle management.
//!
//! [`BagLifecycleManager`] keeps the metadata record of a bag and its
//! container in the storage backend consistent across create, update,
//! validate and delete. It does no locking of its own; callers serialize
//! conflicting calls per `(user, file)` and per bag (see [`crate::locks`]).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::storage::{
    BagId, BagStorage, ContainerHandle, ContentEntry, FileId, HashAlgorithm, StorageError,
    StorageRoot,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityAction, AuditEventEmitter};
use crate::config::AuditConfig;
use crate::error::{BagError, BagResult};
use crate::store::{BagRecord, BagRecordStore, NewBagRecord};

/// Type tag carried by every list item.
pub const BAG_ITEM_TYPE: &str = "bag";

/// Collaborators of the manager.
#[derive(Clone)]
pub struct BagManagerDeps {
    pub store: Arc<dyn BagRecordStore>,
    pub storage: Arc<dyn BagStorage>,
    pub emitter: AuditEventEmitter,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BagConfig {
    pub default_hash: HashAlgorithm,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    /// Falls back to [`BagConfig::default_hash`].
    pub hash: Option<HashAlgorithm>,
    pub emit_event: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            hash: None,
            emit_event: true,
        }
    }
}

/// One entry of [`BagLifecycleManager::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BagSummary {
    pub id: BagId,
    pub name: String,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub replica_d: u32,
    pub replica_sm: u32,
}

/// Outcome of an integrity check that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Digest matched; `updated` has been advanced.
    Valid(BagRecord),
    /// Digest differs from the stored one; nothing was changed.
    Mismatch {
        record: BagRecord,
        expected: String,
        actual: String,
    },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn record(&self) -> &BagRecord {
        match self {
            Validation::Valid(record) | Validation::Mismatch { record, .. } => record,
        }
    }
}

#[derive(Clone)]
pub struct BagLifecycleManager {
    store: Arc<dyn BagRecordStore>,
    storage: Arc<dyn BagStorage>,
    emitter: AuditEventEmitter,
    config: BagConfig,
}

impl BagLifecycleManager {
    pub fn new(deps: BagManagerDeps, config: BagConfig) -> Self {
        Self {
            store: deps.store,
            storage: deps.storage,
            emitter: deps.emitter,
            config,
        }
    }

    pub fn config(&self) -> &BagConfig {
        &self.config
    }

    /// Bag `file_id` with the default algorithm and emit a create event.
    pub async fn create(&self, user_id: &str, file_id: FileId) -> BagResult<BagRecord> {
        self.create_with(user_id, file_id, CreateOptions::default())
            .await
    }

    pub async fn create_with(
        &self,
        user_id: &str,
        file_id: FileId,
        options: CreateOptions,
    ) -> BagResult<BagRecord> {
        let algorithm = options.hash.unwrap_or(self.config.default_hash);
        let container = self
            .storage
            .create_container(user_id, file_id, algorithm)
            .await?;

        let record = match self
            .persist_new(user_id, file_id, algorithm, &container, options.emit_event)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.discard(user_id, container.id).await;
                return Err(e);
            }
        };
        info!(user_id, %file_id, bag_id = %record.bag_id, %algorithm, "Bag created");

        if options.emit_event {
            self.audit_after_commit(user_id, ActivityAction::Create, file_id)
                .await;
        }
        Ok(record)
    }

    async fn persist_new(
        &self,
        user_id: &str,
        file_id: FileId,
        algorithm: HashAlgorithm,
        container: &ContainerHandle,
        emit_event: bool,
    ) -> BagResult<BagRecord> {
        let hash_value = self
            .storage
            .compute_digest(user_id, container, algorithm)
            .await?;
        if emit_event {
            self.audit_before_commit(user_id, ActivityAction::Create, file_id)
                .await?;
        }
        let now = Utc::now();
        let record = self
            .store
            .insert(NewBagRecord {
                file_id,
                bag_id: container.id,
                user_id: user_id.to_string(),
                hash_type: algorithm,
                hash_value,
                created: now,
                updated: now,
            })
            .await?;
        Ok(record)
    }

    /// Every bag of `user_id` whose container still resolves.
    pub async fn list(&self, user_id: &str) -> BagResult<Vec<BagSummary>> {
        let records = self.store.find_all(user_id).await?;
        let mut items = Vec::with_capacity(records.len());

        for record in records {
            let container = match self.storage.resolve_by_id(user_id, record.bag_id).await {
                Ok(Some(container)) => container,
                Ok(None) => {
                    debug!(user_id, bag_id = %record.bag_id, "Skipping bag without container");
                    continue;
                }
                // Removed between the existence check and the size walk.
                Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            items.push(BagSummary {
                id: container.id,
                name: container.name,
                size: container.size,
                timestamp: record.created,
                kind: BAG_ITEM_TYPE,
                replica_d: 0,
                replica_sm: 0,
            });
        }
        Ok(items)
    }

    pub async fn find_by_bag_id(&self, user_id: &str, bag_id: BagId) -> BagResult<Vec<BagRecord>> {
        Ok(self.store.find_by_bag_id(bag_id, user_id).await?)
    }

    pub async fn find_by_file_id(
        &self,
        user_id: &str,
        file_id: FileId,
    ) -> BagResult<Vec<BagRecord>> {
        Ok(self.store.find_by_file_id(file_id, user_id).await?)
    }

    /// Entries of the container bagged from `file_id`.
    pub async fn show_content(
        &self,
        user_id: &str,
        file_id: FileId,
    ) -> BagResult<Vec<ContentEntry>> {
        let record = self.store.find_one_by_file_id(file_id, user_id).await?;
        Ok(self.storage.list_contents(user_id, record.bag_id).await?)
    }

    /// Re-bag `file_id` in place, keeping the record's identity and algorithm.
    ///
    /// The replacement is built and digested before the old container is
    /// removed; if either step (or a strict audit) fails the record and old
    /// container are left as they were.
    pub async fn update(&self, user_id: &str, file_id: FileId) -> BagResult<BagRecord> {
        let mut record = self.store.find_one_by_file_id(file_id, user_id).await?;
        let algorithm = record.hash_type;

        let replacement = self
            .storage
            .create_container(user_id, file_id, algorithm)
            .await?;

        let hash_value = match self
            .storage
            .compute_digest(user_id, &replacement, algorithm)
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                self.discard(user_id, replacement.id).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .audit_before_commit(user_id, ActivityAction::Update, file_id)
            .await
        {
            self.discard(user_id, replacement.id).await;
            return Err(e);
        }

        let old_bag_id = record.bag_id;
        if let Err(e) = self.storage.delete_container(user_id, old_bag_id).await {
            self.discard(user_id, replacement.id).await;
            return Err(e.into());
        }

        record.bag_id = replacement.id;
        record.hash_value = hash_value;
        record.updated = Utc::now();
        let record = self.store.update(&record).await.inspect_err(|e| {
            error!(
                user_id, %file_id, %old_bag_id, new_bag_id = %replacement.id, error = %e,
                "Old container removed but record swap failed"
            );
        })?;
        info!(user_id, %file_id, %old_bag_id, bag_id = %record.bag_id, "Bag updated");

        self.audit_after_commit(user_id, ActivityAction::Update, file_id)
            .await;
        Ok(record)
    }

    /// Recompute the digest of the existing container and compare it with
    /// the stored one. Only a match touches the record, and only `updated`.
    pub async fn validate(&self, user_id: &str, file_id: FileId) -> BagResult<Validation> {
        let mut record = self.store.find_one_by_file_id(file_id, user_id).await?;

        let container = self
            .storage
            .resolve_by_id(user_id, record.bag_id)
            .await?
            .ok_or_else(|| BagError::NotFound(format!("bag container {}", record.bag_id)))?;
        let actual = self
            .storage
            .compute_digest(user_id, &container, record.hash_type)
            .await?;

        if actual != record.hash_value {
            warn!(
                user_id, %file_id, bag_id = %record.bag_id,
                expected = %record.hash_value, actual = %actual,
                "Bag integrity mismatch"
            );
            let expected = record.hash_value.clone();
            return Ok(Validation::Mismatch {
                record,
                expected,
                actual,
            });
        }

        self.audit_before_commit(user_id, ActivityAction::Validate, file_id)
            .await?;
        record.updated = Utc::now();
        let record = self.store.update(&record).await?;
        info!(user_id, %file_id, bag_id = %record.bag_id, "Bag validated");

        self.audit_after_commit(user_id, ActivityAction::Validate, file_id)
            .await;
        Ok(Validation::Valid(record))
    }

    /// Delete a bag and every record pointing at it.
    ///
    /// The container goes first so that an interrupted delete leaves a
    /// record without container, which `list` skips and a retry removes.
    /// Returns the number of records removed.
    pub async fn delete(&self, user_id: &str, bag_id: BagId, emit_event: bool) -> BagResult<usize> {
        let records = self.store.find_by_bag_id(bag_id, user_id).await?;
        let Some(file_id) = records.first().map(|r| r.file_id) else {
            return Err(BagError::NotFound(format!("bag {bag_id}")));
        };

        if emit_event {
            self.audit_before_commit(user_id, ActivityAction::Delete, file_id)
                .await?;
        }
        if !self.storage.delete_container(user_id, bag_id).await? {
            warn!(user_id, %bag_id, "Bag container already gone");
        }
        self.store.delete_many(&records).await?;
        info!(user_id, %bag_id, records = records.len(), "Bag deleted");

        if emit_event {
            self.audit_after_commit(user_id, ActivityAction::Delete, file_id)
                .await;
        }
        Ok(records.len())
    }

    /// The folder holding all of `user_id`'s containers.
    pub async fn storage_summary(&self, user_id: &str) -> BagResult<StorageRoot> {
        Ok(self.storage.root_container(user_id).await?)
    }

    /// Strict audit: publish ahead of the write it describes, so a failed
    /// publish aborts the operation with nothing committed.
    async fn audit_before_commit(
        &self,
        user_id: &str,
        action: ActivityAction,
        file_id: FileId,
    ) -> BagResult<()> {
        if self.config.audit.enabled && self.config.audit.strict {
            self.emitter.emit(user_id, action, file_id).await?;
        }
        Ok(())
    }

    /// Relaxed audit: publish once the write is committed; failures are logged only.
    async fn audit_after_commit(&self, user_id: &str, action: ActivityAction, file_id: FileId) {
        if !self.config.audit.enabled || self.config.audit.strict {
            return;
        }
        if let Err(e) = self.emitter.emit(user_id, action, file_id).await {
            warn!(user_id, %file_id, action = action.subject(), error = %e, "Activity not published");
        }
    }

    /// Best-effort removal of a container that never got a record.
    async fn discard(&self, user_id: &str, bag_id: BagId) {
        match self.storage.delete_container(user_id, bag_id).await {
            Ok(_) => debug!(user_id, %bag_id, "Discarded staged container"),
            Err(e) => error!(user_id, %bag_id, error = %e, "Failed to discard staged container"),
        }
    }
}
