mod error;
mod hash;
mod traits;
mod types;

pub mod filesystem;
pub mod resolver;

pub use error::StorageError;
pub use hash::{HashAlgorithm, StreamHasher};
pub use traits::{BagStorage, FileResolver};
pub use types::{BagId, ContainerHandle, ContentEntry, FileId, SourceFile, StorageRoot};
