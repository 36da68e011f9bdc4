use std::fs::Metadata;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use super::error::StorageError;
use super::filesystem::{tree_size, user_root};
use super::traits::FileResolver;
use super::types::{FileId, SourceFile};

/// Name of the folder under each user root that holds source content.
pub const FILES_DIR: &str = "files";

/// Resolves file ids against `{base_path}/{user}/files`.
///
/// A file id is the node id of the entry on the host filesystem, so it stays
/// stable across renames within the tree.
#[derive(Debug, Clone)]
pub struct FilesystemFileResolver {
    base_path: PathBuf,
}

impl FilesystemFileResolver {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Folder holding the user's source content.
    pub fn files_dir(&self, user_id: &str) -> Result<PathBuf, StorageError> {
        Ok(user_root(&self.base_path, user_id)?.join(FILES_DIR))
    }

    /// Look up the file id of a path relative to the user's files folder.
    pub async fn file_id(&self, user_id: &str, relative: &str) -> Result<FileId, StorageError> {
        let path = self.files_dir(user_id)?.join(relative);
        let meta = tokio::fs::symlink_metadata(&path).await?;
        Ok(node_id(&path, &meta))
    }
}

#[async_trait]
impl FileResolver for FilesystemFileResolver {
    async fn resolve(
        &self,
        user_id: &str,
        file_id: FileId,
    ) -> Result<Option<SourceFile>, StorageError> {
        let root = user_root(&self.base_path, user_id)?;
        tokio::task::spawn_blocking(move || find_node(&root, file_id)).await?
    }
}

fn find_node(root: &Path, file_id: FileId) -> Result<Option<SourceFile>, StorageError> {
    let files = root.join(FILES_DIR);
    if !files.is_dir() {
        return Ok(None);
    }

    for entry in WalkDir::new(&files).min_depth(1).follow_links(false) {
        let entry = entry?;
        let meta = entry.metadata()?;
        // Links may point outside the user's tree; they never resolve.
        if meta.file_type().is_symlink() || node_id(entry.path(), &meta) != file_id {
            continue;
        }

        let internal_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
            .to_string_lossy()
            .replace('\\', "/");
        let size = if meta.is_dir() {
            tree_size(entry.path())?
        } else {
            meta.len()
        };

        return Ok(Some(SourceFile {
            id: file_id,
            name: entry.file_name().to_string_lossy().into_owned(),
            internal_path,
            location: entry.path().to_path_buf(),
            size,
            is_dir: meta.is_dir(),
        }));
    }

    Ok(None)
}

#[cfg(unix)]
fn node_id(_path: &Path, meta: &Metadata) -> FileId {
    use std::os::unix::fs::MetadataExt;
    FileId(meta.ino() as i64)
}

#[cfg(not(unix))]
fn node_id(path: &Path, _meta: &Metadata) -> FileId {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    FileId((hasher.finish() >> 1) as i64)
}
