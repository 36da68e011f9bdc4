use std::path::PathBuf;

use serde::Deserialize;

use crate::storage::HashAlgorithm;

/// App-level storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Root of every user tree (`{data_dir}/{user}/files`, `{data_dir}/{user}/bagit`).
    /// Default: "./data".
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Largest source payload that may be bagged, in bytes. Default: 1 GiB.
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: u64,
}

fn default_data_dir() -> PathBuf {
    "./data".into()
}
fn default_max_payload_size() -> u64 {
    1024 * 1024 * 1024
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_payload_size: default_max_payload_size(),
        }
    }
}

/// Bag creation defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BagAppConfig {
    /// Algorithm used when a caller does not name one. Default: "md5".
    #[serde(default)]
    pub default_hash: HashAlgorithm,
}
