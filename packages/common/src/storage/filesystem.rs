use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use walkdir::WalkDir;

use super::error::StorageError;
use super::hash::HashAlgorithm;
use super::traits::{BagStorage, FileResolver};
use super::types::{BagId, ContainerHandle, ContentEntry, FileId, SourceFile, StorageRoot};

/// Name of the folder under each user root that holds bag containers.
pub const BAGS_DIR: &str = "bagit";
/// Tag file excluded from the container digest; it carries the bagging date.
pub const BAG_INFO_FILE: &str = "bag-info.txt";

const STAGING_DIR: &str = ".tmp";
const PAYLOAD_DIR: &str = "data";
const BAGIT_DECLARATION: &str = "BagIt-Version: 0.97\nTag-File-Character-Encoding: UTF-8\n";

/// Filesystem-backed bag storage.
///
/// Containers live under `{base_path}/{user}/bagit/{bag_id}` and are built in
/// `{base_path}/{user}/bagit/.tmp` first, so a half-written bag never resolves.
pub struct FilesystemBagStorage {
    base_path: PathBuf,
    max_payload_size: u64,
    resolver: Arc<dyn FileResolver>,
}

impl FilesystemBagStorage {
    /// Create a new filesystem bag storage.
    pub async fn new(
        base_path: PathBuf,
        max_payload_size: u64,
        resolver: Arc<dyn FileResolver>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self {
            base_path,
            max_payload_size,
            resolver,
        })
    }

    fn bags_dir(&self, user_id: &str) -> Result<PathBuf, StorageError> {
        Ok(user_root(&self.base_path, user_id)?.join(BAGS_DIR))
    }

    /// Location of a container on disk, whether or not it exists.
    pub fn bag_path(&self, user_id: &str, bag_id: BagId) -> Result<PathBuf, StorageError> {
        Ok(self.bags_dir(user_id)?.join(bag_id.to_string()))
    }

    async fn handle_for(
        &self,
        bag_id: BagId,
        path: PathBuf,
    ) -> Result<ContainerHandle, StorageError> {
        tokio::task::spawn_blocking(move || {
            Ok(ContainerHandle {
                id: bag_id,
                name: read_bag_name(&path).unwrap_or_else(|| bag_id.to_string()),
                size: tree_size(&path)?,
            })
        })
        .await?
    }
}

#[async_trait]
impl BagStorage for FilesystemBagStorage {
    async fn create_container(
        &self,
        user_id: &str,
        file_id: FileId,
        algorithm: HashAlgorithm,
    ) -> Result<ContainerHandle, StorageError> {
        let source = self
            .resolver
            .resolve(user_id, file_id)
            .await?
            .ok_or(StorageError::SourceNotFound(file_id))?;

        if source.size > self.max_payload_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: source.size,
                limit: self.max_payload_size,
            });
        }

        let bags_dir = self.bags_dir(user_id)?;
        let staging = bags_dir.join(STAGING_DIR).join(uuid::Uuid::new_v4().to_string());
        fs::create_dir_all(&staging).await?;

        let build_dir = staging.clone();
        let built = tokio::task::spawn_blocking(move || build_bag(&build_dir, &source, algorithm))
            .await
            .map_err(StorageError::from)
            .and_then(|r| r);
        if let Err(e) = built {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        let bag_id = BagId::new();
        let bag_path = bags_dir.join(bag_id.to_string());
        if let Err(e) = fs::rename(&staging, &bag_path).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e.into());
        }

        tracing::debug!(user_id, %file_id, %bag_id, %algorithm, "Bag container created");
        self.handle_for(bag_id, bag_path).await
    }

    async fn compute_digest(
        &self,
        user_id: &str,
        container: &ContainerHandle,
        algorithm: HashAlgorithm,
    ) -> Result<String, StorageError> {
        let path = self.bag_path(user_id, container.id)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::ContainerNotFound(container.id));
        }
        tokio::task::spawn_blocking(move || digest_tree(&path, algorithm)).await?
    }

    async fn list_contents(
        &self,
        user_id: &str,
        bag_id: BagId,
    ) -> Result<Vec<ContentEntry>, StorageError> {
        let path = self.bag_path(user_id, bag_id)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::ContainerNotFound(bag_id));
        }
        tokio::task::spawn_blocking(move || list_tree(&path)).await?
    }

    async fn delete_container(&self, user_id: &str, bag_id: BagId) -> Result<bool, StorageError> {
        let path = self.bag_path(user_id, bag_id)?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_by_id(
        &self,
        user_id: &str,
        bag_id: BagId,
    ) -> Result<Option<ContainerHandle>, StorageError> {
        let path = self.bag_path(user_id, bag_id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        self.handle_for(bag_id, path).await.map(Some)
    }

    async fn root_container(&self, user_id: &str) -> Result<StorageRoot, StorageError> {
        let dir = self.bags_dir(user_id)?;
        tokio::task::spawn_blocking(move || {
            let mut root = StorageRoot {
                name: BAGS_DIR.to_string(),
                size: 0,
                bags: 0,
            };
            if !dir.is_dir() {
                return Ok(root);
            }
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_name() == STAGING_DIR || !entry.file_type()?.is_dir() {
                    continue;
                }
                root.bags += 1;
                root.size += tree_size(&entry.path())?;
            }
            Ok(root)
        })
        .await?
    }
}

/// Map a user id onto its storage root, rejecting ids that would escape `base`.
pub(super) fn user_root(base: &Path, user_id: &str) -> Result<PathBuf, StorageError> {
    let invalid = user_id.is_empty()
        || user_id.starts_with('.')
        || user_id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidUser(user_id.to_string()));
    }
    Ok(base.join(user_id))
}

/// Total bytes of every regular file below `path`.
pub(super) fn tree_size(path: &Path) -> Result<u64, StorageError> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn build_bag(dir: &Path, source: &SourceFile, algorithm: HashAlgorithm) -> Result<(), StorageError> {
    let payload = dir.join(PAYLOAD_DIR);
    let target = payload.join(&source.name);

    if source.is_dir {
        for entry in WalkDir::new(&source.location).follow_links(false) {
            let entry = entry?;
            let dest = target.join(entry.path().strip_prefix(&source.location).unwrap_or(entry.path()));
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else if entry.file_type().is_file() {
                std::fs::copy(entry.path(), &dest)?;
            }
        }
    } else {
        if !std::fs::symlink_metadata(&source.location)?.is_file() {
            return Err(StorageError::SourceNotFound(source.id));
        }
        std::fs::create_dir_all(&payload)?;
        std::fs::copy(&source.location, &target)?;
    }

    let mut manifest = String::new();
    let mut octets = 0u64;
    let mut streams = 0u64;
    for entry in WalkDir::new(&payload).sort_by_file_name().follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let mut hasher = algorithm.hasher();
        octets += hash_file(entry.path(), |chunk| hasher.update(chunk))?;
        streams += 1;
        manifest.push_str(&format!(
            "{}  {}\n",
            hasher.finalize_hex(),
            relative(dir, entry.path())
        ));
    }

    std::fs::write(dir.join("bagit.txt"), BAGIT_DECLARATION)?;
    std::fs::write(dir.join(format!("manifest-{algorithm}.txt")), manifest)?;
    std::fs::write(
        dir.join(BAG_INFO_FILE),
        format!(
            "Bag-Name: {}\nSource-File-Id: {}\nBagging-Date: {}\nPayload-Oxum: {octets}.{streams}\n",
            source.name,
            source.id,
            Utc::now().format("%Y-%m-%d"),
        ),
    )?;
    Ok(())
}

/// Feed a file through `sink` in 64KB chunks and return its length.
fn hash_file(path: &Path, mut sink: impl FnMut(&[u8])) -> Result<u64, StorageError> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        sink(&buf[..n]);
    }
    Ok(total)
}

/// Digest every file of a container except the bag-info tag file, in sorted
/// path order. Each file contributes `path NUL len content`, with `len` as a
/// little-endian u64 so file boundaries cannot shift between files.
fn digest_tree(root: &Path, algorithm: HashAlgorithm) -> Result<String, StorageError> {
    let mut hasher = algorithm.hasher();
    for entry in WalkDir::new(root).sort_by_file_name().follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative(root, entry.path());
        if rel == BAG_INFO_FILE {
            continue;
        }
        hasher.update(rel.as_bytes());
        hasher.update(&[0]);
        hasher.update(&entry.metadata()?.len().to_le_bytes());
        hash_file(entry.path(), |chunk| hasher.update(chunk))?;
    }
    Ok(hasher.finalize_hex())
}

fn list_tree(root: &Path) -> Result<Vec<ContentEntry>, StorageError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name().follow_links(false) {
        let entry = entry?;
        let is_dir = entry.file_type().is_dir();
        entries.push(ContentEntry {
            path: relative(root, entry.path()),
            size: if is_dir { tree_size(entry.path())? } else { entry.metadata()?.len() },
            is_dir,
        });
    }
    Ok(entries)
}

fn read_bag_name(root: &Path) -> Option<String> {
    let info = std::fs::read_to_string(root.join(BAG_INFO_FILE)).ok()?;
    info.lines()
        .find_map(|line| line.strip_prefix("Bag-Name:"))
        .map(|name| name.trim().to_string())
}
