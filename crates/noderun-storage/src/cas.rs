//! In-memory content-addressed store with mutable name records.
//!
//! Content is addressed by the SHA-256 of its bytes. Name records map a
//! stable name to the latest content hash. Pins keep content alive; content
//! that is unpinned and no longer named is dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use noderun_core::storage::{
    CreateRequest, DeleteRequest, IpfsOptions, IpnsOperation, ListRequest, ReadRequest,
    SearchRequest, StorageLocation, StorageMetadata, StorageObject, StorageType, UpdateRequest,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{create_bytes, decode_stored, sha256_hex, StorageBackend};
use crate::error::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct CasState {
    blobs: HashMap<String, Vec<u8>>,
    pins: BTreeSet<String>,
    names: BTreeMap<String, String>,
}

/// Content-addressed store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    state: RwLock<CasState>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_pinned(&self, hash: &str) -> bool {
        self.state.read().await.pins.contains(hash)
    }

    /// Current content hash behind a name record.
    pub async fn resolve_name(&self, name: &str) -> Option<String> {
        self.state.read().await.names.get(name).cloned()
    }

    /// Store and pin `bytes`, then apply the name-record and unpin options.
    async fn put(&self, bytes: &[u8], options: &IpfsOptions) -> StorageResult<StorageObject> {
        let hash = sha256_hex(bytes);
        let mut state = self.state.write().await;

        let name = match options.ipns_operation {
            IpnsOperation::Skip => None,
            IpnsOperation::Create => {
                let name = options
                    .ipns_name
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
                if state.names.contains_key(&name) {
                    return Err(StorageError::backend(format!(
                        "name record '{name}' already exists"
                    )));
                }
                Some(name)
            }
            IpnsOperation::Update => {
                let name = options
                    .ipns_name
                    .clone()
                    .ok_or_else(|| StorageError::backend("name update requires ipns_name"))?;
                if !state.names.contains_key(&name) {
                    return Err(StorageError::not_found(format!("name record '{name}'")));
                }
                Some(name)
            }
        };

        state.blobs.insert(hash.clone(), bytes.to_vec());
        state.pins.insert(hash.clone());
        if let Some(name) = &name {
            state.names.insert(name.clone(), hash.clone());
            info!(name = %name, hash = %hash, "Published name record");
        }
        if options.unpin_previous {
            if let Some(previous) = options.previous_hash.as_deref() {
                if previous != hash && state.pins.remove(previous) {
                    debug!(hash = %previous, "Unpinned previous content");
                    if !state.names.values().any(|target| target == previous) {
                        state.blobs.remove(previous);
                    }
                }
            }
        }

        let mut metadata = StorageMetadata {
            size: Some(bytes.len() as u64),
            checksum: Some(hash.clone()),
            content_type: Some(decode_stored(bytes).1.to_string()),
            ..Default::default()
        };
        if let Some(name) = name {
            metadata
                .custom
                .insert("ipns_name".to_string(), Value::String(name));
        }
        Ok(StorageObject::new(location(&hash), None).with_metadata(metadata))
    }
}

fn location(hash: &str) -> StorageLocation {
    StorageLocation::new(StorageType::Ipfs, hash)
}

#[async_trait]
impl StorageBackend for MemoryContentStore {
    fn storage_type(&self) -> StorageType {
        StorageType::Ipfs
    }

    async fn create(&self, request: &CreateRequest) -> StorageResult<StorageObject> {
        let options = request.target.options.ipfs()?;
        let bytes = create_bytes(request)?;
        self.put(&bytes, &options).await
    }

    async fn read(&self, request: &ReadRequest) -> StorageResult<Vec<StorageObject>> {
        let options = request.target.options.ipfs()?;
        let state = self.state.read().await;
        let path = request.target.path.as_str();
        let hash = if options.resolve_ipns {
            state
                .names
                .get(path)
                .ok_or_else(|| StorageError::not_found(format!("name record '{path}'")))?
                .as_str()
        } else {
            path
        };
        let bytes = state
            .blobs
            .get(hash)
            .ok_or_else(|| StorageError::not_found(format!("content '{hash}'")))?;
        let (data, content_type) = decode_stored(bytes);
        Ok(vec![StorageObject::new(location(hash), Some(data)).with_metadata(
            StorageMetadata {
                size: Some(bytes.len() as u64),
                checksum: Some(hash.to_string()),
                content_type: Some(content_type.to_string()),
                ..Default::default()
            },
        )])
    }

    /// Write new content; content is immutable, so an update is a new put
    /// whose name record and pins are adjusted by the options.
    async fn update(&self, request: &UpdateRequest) -> StorageResult<Vec<StorageObject>> {
        let options = request.target.options.ipfs()?;
        let bytes = match &request.data {
            Some(data) => data.to_bytes()?,
            None => return Err(StorageError::backend("update request carries no data")),
        };
        Ok(vec![self.put(&bytes, &options).await?])
    }

    async fn delete(&self, request: &DeleteRequest) -> StorageResult<usize> {
        let hash = &request.target.path;
        let mut state = self.state.write().await;
        if state.blobs.remove(hash).is_none() {
            return Err(StorageError::not_found(format!("content '{hash}'")));
        }
        state.pins.remove(hash);
        state.names.retain(|_, target| target != hash);
        debug!(hash = %hash, "Removed content");
        Ok(1)
    }

    /// Pinned content, in hash order.
    async fn list(&self, _request: &ListRequest) -> StorageResult<Vec<StorageObject>> {
        let state = self.state.read().await;
        Ok(state
            .pins
            .iter()
            .map(|hash| {
                let size = state.blobs.get(hash).map(|b| b.len() as u64);
                StorageObject::new(location(hash), None).with_metadata(StorageMetadata {
                    size,
                    checksum: Some(hash.clone()),
                    ..Default::default()
                })
            })
            .collect())
    }

    /// Name records whose name contains the query text.
    async fn search(&self, request: &SearchRequest) -> StorageResult<Vec<StorageObject>> {
        let needle = match &request.query {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let state = self.state.read().await;
        Ok(state
            .names
            .iter()
            .filter(|(name, _)| name.contains(&needle))
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|(name, hash)| {
                let mut metadata = StorageMetadata {
                    checksum: Some(hash.clone()),
                    ..Default::default()
                };
                metadata
                    .custom
                    .insert("ipns_name".to_string(), Value::String(name.clone()));
                StorageObject::new(location(hash), None).with_metadata(metadata)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_core::storage::StorageRequest;
    use serde_json::json;

    fn create(bytes: &[u8], options: IpfsOptions) -> CreateRequest {
        match StorageRequest::create(StorageType::Ipfs, "", bytes.to_vec())
            .unwrap()
            .with_options(options)
        {
            StorageRequest::Create(create) => create,
            _ => unreachable!(),
        }
    }

    fn ipns_name(object: &StorageObject) -> String {
        object.metadata.custom["ipns_name"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_content_addressed_path() {
        let store = MemoryContentStore::new();
        let object = store.create(&create(b"hello", IpfsOptions::default())).await.unwrap();
        assert_eq!(
            object.location.uri(),
            "ipfs://2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(store.is_pinned(&object.location.path).await);

        let again = store.create(&create(b"hello", IpfsOptions::default())).await.unwrap();
        assert_eq!(again.location, object.location);
    }

    #[tokio::test]
    async fn test_name_record_create_update_resolve() {
        let store = MemoryContentStore::new();
        let first = store
            .create(&create(
                br#"{"v":1}"#,
                IpfsOptions {
                    ipns_operation: IpnsOperation::Create,
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        let name = ipns_name(&first);

        let second = store
            .create(&create(
                br#"{"v":2}"#,
                IpfsOptions {
                    ipns_operation: IpnsOperation::Update,
                    ipns_name: Some(name.clone()),
                    unpin_previous: true,
                    previous_hash: Some(first.location.path.clone()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        assert_eq!(store.resolve_name(&name).await, Some(second.location.path.clone()));
        assert!(!store.is_pinned(&first.location.path).await);
        assert!(store.is_pinned(&second.location.path).await);

        let read = match StorageRequest::read(StorageType::Ipfs, name).with_options(IpfsOptions {
            resolve_ipns: true,
            ..Default::default()
        }) {
            StorageRequest::Read(read) => read,
            _ => unreachable!(),
        };
        let objects = store.read(&read).await.unwrap();
        assert_eq!(objects[0].data, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_update_unknown_name_not_found() {
        let store = MemoryContentStore::new();
        let err = store
            .create(&create(
                b"x",
                IpfsOptions {
                    ipns_operation: IpnsOperation::Update,
                    ipns_name: Some("missing".to_string()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_pin_and_names() {
        let store = MemoryContentStore::new();
        let object = store
            .create(&create(
                b"bye",
                IpfsOptions {
                    ipns_operation: IpnsOperation::Create,
                    ipns_name: Some("farewell".to_string()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        let StorageRequest::Delete(delete) =
            StorageRequest::delete(StorageType::Ipfs, object.location.path.clone(), None)
        else {
            unreachable!()
        };
        assert_eq!(store.delete(&delete).await.unwrap(), 1);
        assert!(!store.is_pinned(&object.location.path).await);
        assert!(store.resolve_name("farewell").await.is_none());
        assert!(store.delete(&delete).await.is_err());
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let store = MemoryContentStore::new();
        store
            .create(&create(
                b"a",
                IpfsOptions {
                    ipns_operation: IpnsOperation::Create,
                    ipns_name: Some("agent-memory".to_string()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        store.create(&create(b"b", IpfsOptions::default())).await.unwrap();

        let StorageRequest::List(list) = StorageRequest::list(StorageType::Ipfs, "") else {
            unreachable!()
        };
        assert_eq!(store.list(&list).await.unwrap().len(), 2);

        let StorageRequest::Search(search) =
            StorageRequest::search(StorageType::Ipfs, "", "memory").unwrap()
        else {
            unreachable!()
        };
        let found = store.search(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(ipns_name(&found[0]), "agent-memory");
    }

    #[tokio::test]
    async fn test_unpinned_previous_content_is_dropped() {
        let store = MemoryContentStore::new();
        let first = store.create(&create(b"v1", IpfsOptions::default())).await.unwrap();
        store
            .create(&create(
                b"v2",
                IpfsOptions {
                    unpin_previous: true,
                    previous_hash: Some(first.location.path.clone()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let StorageRequest::Read(read) =
            StorageRequest::read(StorageType::Ipfs, first.location.path.clone())
        else {
            unreachable!()
        };
        let err = store.read(&read).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let StorageRequest::List(list) = StorageRequest::list(StorageType::Ipfs, "") else {
            unreachable!()
        };
        assert_eq!(store.list(&list).await.unwrap().len(), 1);
    }
}
