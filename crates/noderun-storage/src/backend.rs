//! Storage backend trait and helpers shared by the reference backends.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use noderun_core::storage::{
    CreateRequest, DeleteRequest, ListRequest, ReadRequest, SearchRequest, StorageObject,
    StorageType, UpdateRequest,
};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{StorageError, StorageResult};

/// Outcome of a routed storage request.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageResponse {
    /// A single object written by a create.
    Object(StorageObject),
    /// Objects returned by read, update, list or search.
    Objects(Vec<StorageObject>),
    /// Number of entries removed by a delete.
    Deleted(usize),
}

impl StorageResponse {
    /// All objects carried by the response, in order.
    pub fn into_objects(self) -> Vec<StorageObject> {
        match self {
            Self::Object(object) => vec![object],
            Self::Objects(objects) => objects,
            Self::Deleted(_) => Vec::new(),
        }
    }
}

/// A storage backend for a single [`StorageType`].
///
/// Requests reaching a backend have already been validated and checked for
/// option/backend compatibility by the provider.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// The storage type this backend serves.
    fn storage_type(&self) -> StorageType;

    async fn create(&self, request: &CreateRequest) -> StorageResult<StorageObject>;

    async fn read(&self, request: &ReadRequest) -> StorageResult<Vec<StorageObject>>;

    async fn update(&self, request: &UpdateRequest) -> StorageResult<Vec<StorageObject>>;

    /// Remove entries, returning how many were removed.
    async fn delete(&self, request: &DeleteRequest) -> StorageResult<usize>;

    async fn list(&self, request: &ListRequest) -> StorageResult<Vec<StorageObject>>;

    async fn search(&self, request: &SearchRequest) -> StorageResult<Vec<StorageObject>>;
}

/// Bytes a create request writes: its payload, or the attached stream.
pub(crate) fn create_bytes(request: &CreateRequest) -> StorageResult<Vec<u8>> {
    if let Some(data) = &request.data {
        return Ok(data.to_bytes()?);
    }
    match &request.file {
        Some(file) => Ok(file.read_all()?),
        None => Err(StorageError::backend("create request carries no data")),
    }
}

/// Decode stored bytes into a JSON value with its content type: JSON
/// documents as-is, anything else as a base64 string.
pub(crate) fn decode_stored(bytes: &[u8]) -> (Value, &'static str) {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => (value, "application/json"),
        Err(_) => (Value::String(STANDARD.encode(bytes)), "application/octet-stream"),
    }
}

/// Parse bytes as a JSON mapping, for backends that store rows.
pub(crate) fn bytes_to_map(bytes: &[u8]) -> StorageResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(StorageError::backend("expected a JSON mapping")),
    }
}

/// SHA-256 of `bytes` as lowercase hex.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_core::storage::{InputStream, StorageRequest};
    use serde_json::json;

    #[test]
    fn test_create_bytes_prefers_payload() {
        let map = json!({"name": "test"}).as_object().cloned().unwrap();
        let request = match StorageRequest::create(StorageType::Database, "t", map).unwrap() {
            StorageRequest::Create(create) => create,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(create_bytes(&request).unwrap(), br#"{"name":"test"}"#);
    }

    #[test]
    fn test_create_bytes_reads_stream() {
        let request = match StorageRequest::create_from_stream(
            StorageType::Filesystem,
            "a.bin",
            InputStream::from_bytes(vec![1u8, 2, 3]),
        )
        .unwrap()
        {
            StorageRequest::Create(create) => create,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(create_bytes(&request).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_stored() {
        let (value, content_type) = decode_stored(br#"{"a":1}"#);
        assert_eq!(value, json!({"a": 1}));
        assert_eq!(content_type, "application/json");

        let (value, content_type) = decode_stored(&[0xff, 0x00]);
        assert_eq!(value, json!("/wA="));
        assert_eq!(content_type, "application/octet-stream");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
