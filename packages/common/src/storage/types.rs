use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric identity of a source file or folder inside a user's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identity of a bag container in the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BagId(pub Uuid);

impl BagId {
    /// Allocate a fresh, time-ordered container id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BagId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for BagId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A live view of a bag container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHandle {
    pub id: BagId,
    /// Display name, taken from the bagged source.
    pub name: String,
    /// Total bytes of every file in the container.
    pub size: u64,
}

/// Aggregate view of the folder holding all of a user's bags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageRoot {
    pub name: String,
    pub size: u64,
    pub bags: usize,
}

/// One entry of a container listing, relative to the container root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentEntry {
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
}

/// A source file resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    pub name: String,
    /// Path relative to the user root, e.g. `files/reports/q3.pdf`.
    pub internal_path: String,
    /// Absolute location on the host.
    pub location: PathBuf,
    pub size: u64,
    pub is_dir: bool,
}
