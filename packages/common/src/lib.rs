pub mod config;
pub mod storage;

pub use storage::{BagId, FileId, HashAlgorithm};
