use std::fmt;

use super::types::{BagId, FileId};

/// Errors that can occur during bag storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The source file does not resolve inside the user's tree.
    SourceNotFound(FileId),
    /// The bag container does not exist.
    ContainerNotFound(BagId),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The requested digest algorithm is not supported.
    UnsupportedAlgorithm(String),
    /// The user id cannot be mapped onto a storage tree.
    InvalidUser(String),
    /// The source payload exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// A blocking storage task panicked or was cancelled.
    Task(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceNotFound(id) => write!(f, "source file not found: {id}"),
            Self::ContainerNotFound(id) => write!(f, "bag container not found: {id}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::UnsupportedAlgorithm(name) => write!(f, "unsupported hash algorithm: {name}"),
            Self::InvalidUser(user) => write!(f, "invalid user id for storage: {user:?}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "payload exceeds size limit ({actual} > {limit} bytes)")
            }
            Self::Task(msg) => write!(f, "storage task failed: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<walkdir::Error> for StorageError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.into())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
