//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which reference backends a provider registers, and their settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the filesystem backend.
    pub fs_root: PathBuf,

    /// Register the in-memory database backend.
    pub enable_database: bool,

    /// Register the filesystem backend.
    pub enable_filesystem: bool,

    /// Register the in-memory content-addressed backend.
    pub enable_ipfs: bool,

    /// Result limit applied to searches that do not set one.
    pub default_search_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fs_root: PathBuf::from("./storage"),
            enable_database: true,
            enable_filesystem: true,
            enable_ipfs: true,
            default_search_limit: 10,
        }
    }
}

impl StorageConfig {
    /// Builder method to set the filesystem root.
    pub fn with_fs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.fs_root = root.into();
        self
    }

    /// Builder method to set the default search limit.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.default_search_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: StorageConfig =
            serde_json::from_value(json!({"fs_root": "/tmp/data", "enable_ipfs": false})).unwrap();
        assert_eq!(config.fs_root, PathBuf::from("/tmp/data"));
        assert!(!config.enable_ipfs);
        assert!(config.enable_database);
        assert_eq!(config.default_search_limit, 10);
    }
}
