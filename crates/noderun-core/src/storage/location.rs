//! Storage kinds and URI-addressable locations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

const SCHEME_SEPARATOR: &str = "://";

/// Backend kind a storage location or request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    /// Relational/document database.
    #[serde(rename = "db")]
    Database,
    /// Local filesystem.
    #[serde(rename = "fs")]
    Filesystem,
    /// Content-addressed store.
    #[serde(rename = "ipfs")]
    Ipfs,
}

impl StorageType {
    /// All supported kinds.
    pub const ALL: [StorageType; 3] = [Self::Database, Self::Filesystem, Self::Ipfs];

    /// URI scheme / wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "db",
            Self::Filesystem => "fs",
            Self::Ipfs => "ipfs",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "db" => Ok(Self::Database),
            "fs" => Ok(Self::Filesystem),
            "ipfs" => Ok(Self::Ipfs),
            other => Err(CoreError::validation(format!(
                "unknown storage type '{other}'"
            ))),
        }
    }
}

/// Pointer into one of the storage backends.
///
/// `path` is kept verbatim; any normalisation is up to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub storage_type: StorageType,
    pub path: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl StorageLocation {
    /// Build a location with no options.
    pub fn new(storage_type: StorageType, path: impl Into<String>) -> Self {
        Self {
            storage_type,
            path: path.into(),
            options: Map::new(),
        }
    }

    /// Builder method to add an option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// `"<kind>://<path>"`.
    pub fn uri(&self) -> String {
        format!("{}{}{}", self.storage_type, SCHEME_SEPARATOR, self.path)
    }

    /// Parse a location from its URI, splitting on the first `://`.
    pub fn from_uri(uri: &str) -> Result<Self, CoreError> {
        let (scheme, path) = uri
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| CoreError::InvalidUri {
                uri: uri.to_string(),
                reason: "missing '://' separator".to_string(),
            })?;
        let storage_type = scheme.parse().map_err(|_| CoreError::InvalidUri {
            uri: uri.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        })?;
        Ok(Self::new(storage_type, path))
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl FromStr for StorageLocation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

/// Metadata a backend reports about a stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageMetadata {
    pub content_type: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<String>,
    #[serde(default)]
    pub tags: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub custom: Map<String, Value>,
}

/// An object returned by a backend: where it lives, its data and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageObject {
    pub location: StorageLocation,
    pub data: Option<Value>,
    #[serde(default)]
    pub metadata: StorageMetadata,
}

impl StorageObject {
    /// Create an object with default metadata.
    pub fn new(location: StorageLocation, data: Option<Value>) -> Self {
        Self {
            location,
            data,
            metadata: StorageMetadata::default(),
        }
    }

    /// Builder method to set metadata.
    pub fn with_metadata(mut self, metadata: StorageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
