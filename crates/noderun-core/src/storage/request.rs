//! Typed storage requests.
//!
//! A [`StorageRequest`] is a closed union of the six operations a backend
//! understands. The `request_type` tag is derived from the variant, so a
//! `Create` can never claim to be a `Read`.

use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{StorageLocation, StorageOptions, StorageType};
use crate::CoreError;

/// Operation a storage request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageRequestType {
    Create,
    Read,
    Update,
    Delete,
    List,
    Search,
}

impl StorageRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for StorageRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Data written by a create or update request.
///
/// Raw bytes travel as a base64 string in the wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoragePayload {
    Json(Map<String, Value>),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl StoragePayload {
    /// Bytes to store: raw bytes as-is, mappings as compact JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Json(map) => Ok(serde_json::to_vec(map)?),
        }
    }
}

impl From<Map<String, Value>> for StoragePayload {
    fn from(map: Map<String, Value>) -> Self {
        Self::Json(map)
    }
}

impl From<Vec<u8>> for StoragePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl TryFrom<Value> for StoragePayload {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::Json(map)),
            other => Err(CoreError::validation(format!(
                "storage data must be a mapping, got {other}"
            ))),
        }
    }
}

/// Readable input attached to a create request.
///
/// Streams are local to the process and are not part of the wire form.
#[derive(Clone)]
pub struct InputStream {
    name: Option<String>,
    reader: Arc<Mutex<Box<dyn Read + Send>>>,
}

impl InputStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            name: None,
            reader: Arc::new(Mutex::new(Box::new(reader))),
        }
    }

    /// Stream over an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(bytes.into()))
    }

    /// Builder method to set the original file name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Drain the remaining bytes of the stream.
    pub fn read_all(&self) -> Result<Vec<u8>, CoreError> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| CoreError::validation("input stream lock poisoned"))?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| CoreError::validation(format!("failed to read input stream: {e}")))?;
        Ok(buf)
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for InputStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.reader, &other.reader)
    }
}

/// Fields shared by every storage request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTarget {
    pub storage_type: StorageType,
    pub path: String,
    #[serde(default)]
    pub options: StorageOptions,
}

impl RequestTarget {
    pub fn new(storage_type: StorageType, path: impl Into<String>) -> Self {
        Self {
            storage_type,
            path: path.into(),
            options: StorageOptions::default(),
        }
    }

    pub fn location(&self) -> StorageLocation {
        StorageLocation::new(self.storage_type, self.path.clone())
    }
}

impl From<StorageLocation> for RequestTarget {
    fn from(location: StorageLocation) -> Self {
        Self {
            storage_type: location.storage_type,
            path: location.path,
            options: StorageOptions::Generic(location.options),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(flatten)]
    pub target: RequestTarget,
    pub data: Option<StoragePayload>,
    #[serde(skip)]
    pub file: Option<InputStream>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    #[serde(flatten)]
    pub target: RequestTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub target: RequestTarget,
    pub data: Option<StoragePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(flatten)]
    pub target: RequestTarget,
    pub condition: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(flatten)]
    pub target: RequestTarget,
}

fn default_query_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub target: RequestTarget,
    pub query: Value,
    #[serde(default = "default_query_type")]
    pub query_type: String,
    pub limit: Option<usize>,
}

/// A typed operation against a storage location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "lowercase")]
pub enum StorageRequest {
    Create(CreateRequest),
    Read(ReadRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    List(ListRequest),
    Search(SearchRequest),
}

impl StorageRequest {
    /// Create request writing `data`.
    pub fn create(
        storage_type: StorageType,
        path: impl Into<String>,
        data: impl Into<StoragePayload>,
    ) -> Result<Self, CoreError> {
        Self::Create(CreateRequest {
            target: RequestTarget::new(storage_type, path),
            data: Some(data.into()),
            file: None,
        })
        .validated()
    }

    /// Create request reading its content from `file`.
    pub fn create_from_stream(
        storage_type: StorageType,
        path: impl Into<String>,
        file: InputStream,
    ) -> Result<Self, CoreError> {
        Self::Create(CreateRequest {
            target: RequestTarget::new(storage_type, path),
            data: None,
            file: Some(file),
        })
        .validated()
    }

    pub fn read(storage_type: StorageType, path: impl Into<String>) -> Self {
        Self::Read(ReadRequest {
            target: RequestTarget::new(storage_type, path),
        })
    }

    pub fn update(
        storage_type: StorageType,
        path: impl Into<String>,
        data: impl Into<StoragePayload>,
    ) -> Result<Self, CoreError> {
        Self::Update(UpdateRequest {
            target: RequestTarget::new(storage_type, path),
            data: Some(data.into()),
        })
        .validated()
    }

    pub fn delete(
        storage_type: StorageType,
        path: impl Into<String>,
        condition: Option<Map<String, Value>>,
    ) -> Self {
        Self::Delete(DeleteRequest {
            target: RequestTarget::new(storage_type, path),
            condition,
        })
    }

    pub fn list(storage_type: StorageType, path: impl Into<String>) -> Self {
        Self::List(ListRequest {
            target: RequestTarget::new(storage_type, path),
        })
    }

    /// Text search for `query`.
    pub fn search(
        storage_type: StorageType,
        path: impl Into<String>,
        query: impl Into<Value>,
    ) -> Result<Self, CoreError> {
        Self::Search(SearchRequest {
            target: RequestTarget::new(storage_type, path),
            query: query.into(),
            query_type: default_query_type(),
            limit: None,
        })
        .validated()
    }

    /// Builder method to attach options.
    pub fn with_options(mut self, options: impl Into<StorageOptions>) -> Self {
        self.target_mut().options = options.into();
        self
    }

    /// Builder method to cap search results. No-op on other request types.
    pub fn with_limit(mut self, limit: usize) -> Self {
        if let Self::Search(search) = &mut self {
            search.limit = Some(limit);
        }
        self
    }

    /// Builder method to set the search query type. No-op on other request types.
    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        if let Self::Search(search) = &mut self {
            search.query_type = query_type.into();
        }
        self
    }

    pub fn request_type(&self) -> StorageRequestType {
        match self {
            Self::Create(_) => StorageRequestType::Create,
            Self::Read(_) => StorageRequestType::Read,
            Self::Update(_) => StorageRequestType::Update,
            Self::Delete(_) => StorageRequestType::Delete,
            Self::List(_) => StorageRequestType::List,
            Self::Search(_) => StorageRequestType::Search,
        }
    }

    pub fn target(&self) -> &RequestTarget {
        match self {
            Self::Create(r) => &r.target,
            Self::Read(r) => &r.target,
            Self::Update(r) => &r.target,
            Self::Delete(r) => &r.target,
            Self::List(r) => &r.target,
            Self::Search(r) => &r.target,
        }
    }

    fn target_mut(&mut self) -> &mut RequestTarget {
        match self {
            Self::Create(r) => &mut r.target,
            Self::Read(r) => &mut r.target,
            Self::Update(r) => &mut r.target,
            Self::Delete(r) => &mut r.target,
            Self::List(r) => &mut r.target,
            Self::Search(r) => &mut r.target,
        }
    }

    pub fn storage_type(&self) -> StorageType {
        self.target().storage_type
    }

    pub fn path(&self) -> &str {
        &self.target().path
    }

    pub fn options(&self) -> &StorageOptions {
        &self.target().options
    }

    pub fn location(&self) -> StorageLocation {
        self.target().location()
    }

    /// Check that the payload matches the request kind and that the
    /// options are internally consistent.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Create(r) if r.data.is_none() && r.file.is_none() => {
                return Err(CoreError::validation("create request requires data or a file stream"))
            }
            Self::Update(r) if r.data.is_none() => {
                return Err(CoreError::validation("update request requires data"))
            }
            Self::Search(r) if r.query.is_null() => {
                return Err(CoreError::validation("search request requires a query"))
            }
            _ => {}
        }
        self.options().validate()
    }

    /// Fail if structured options target a different backend than this
    /// request. Callers run this before dispatch.
    pub fn check_backend(&self) -> Result<(), CoreError> {
        self.options().check_backend(self.storage_type())
    }

    fn validated(self) -> Result<Self, CoreError> {
        self.validate()?;
        Ok(self)
    }
}
