use async_trait::async_trait;

use super::error::StorageError;
use super::hash::HashAlgorithm;
use super::types::{BagId, ContainerHandle, ContentEntry, FileId, SourceFile, StorageRoot};

/// Storage backend that materializes bag containers from source files.
///
/// Every call is scoped to the user whose tree holds both the source file
/// and the container. Implementations are responsible for their own
/// internal consistency; callers serialize conflicting calls per key.
#[async_trait]
pub trait BagStorage: Send + Sync {
    /// Build a new container from the content of `file_id`.
    ///
    /// The container must not resolve until it is fully written.
    async fn create_container(
        &self,
        user_id: &str,
        file_id: FileId,
        algorithm: HashAlgorithm,
    ) -> Result<ContainerHandle, StorageError>;

    /// Compute the digest of a container's current contents.
    async fn compute_digest(
        &self,
        user_id: &str,
        container: &ContainerHandle,
        algorithm: HashAlgorithm,
    ) -> Result<String, StorageError>;

    /// List every entry of a container.
    async fn list_contents(
        &self,
        user_id: &str,
        bag_id: BagId,
    ) -> Result<Vec<ContentEntry>, StorageError>;

    /// Destroy a container.
    ///
    /// Returns `true` if the container was deleted, `false` if it did not exist.
    async fn delete_container(&self, user_id: &str, bag_id: BagId) -> Result<bool, StorageError>;

    /// Resolve a container by id, reading its name and size live.
    async fn resolve_by_id(
        &self,
        user_id: &str,
        bag_id: BagId,
    ) -> Result<Option<ContainerHandle>, StorageError>;

    /// The folder that holds all of a user's containers.
    async fn root_container(&self, user_id: &str) -> Result<StorageRoot, StorageError>;
}

/// Host facility that maps numeric file ids onto a user's tree.
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn resolve(
        &self,
        user_id: &str,
        file_id: FileId,
    ) -> Result<Option<SourceFile>, StorageError>;
}
