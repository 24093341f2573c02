//! Routes storage requests to the backend registered for their type.

use std::collections::HashMap;
use std::sync::Arc;

use noderun_core::storage::{StorageRequest, StorageType};
use tracing::{info, warn};

use crate::backend::{StorageBackend, StorageResponse};
use crate::cas::MemoryContentStore;
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::fs::FilesystemStorage;
use crate::memory::MemoryDatabase;

/// Storage router keyed by [`StorageType`].
///
/// Every request is validated and checked for option/backend compatibility
/// before it reaches a backend.
pub struct StorageProvider {
    backends: HashMap<StorageType, Arc<dyn StorageBackend>>,
    default_search_limit: usize,
}

impl Default for StorageProvider {
    fn default() -> Self {
        Self {
            backends: HashMap::new(),
            default_search_limit: StorageConfig::default().default_search_limit,
        }
    }
}

impl StorageProvider {
    /// A provider with no backends registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the reference backends enabled in `config`.
    pub fn from_config(config: &StorageConfig) -> Self {
        let mut provider = Self {
            backends: HashMap::new(),
            default_search_limit: config.default_search_limit,
        };
        if config.enable_database {
            provider.register(Arc::new(MemoryDatabase::new()));
        }
        if config.enable_filesystem {
            provider.register(Arc::new(FilesystemStorage::new(config.fs_root.clone())));
        }
        if config.enable_ipfs {
            provider.register(Arc::new(MemoryContentStore::new()));
        }
        provider
    }

    /// Register a backend, replacing any previous one for the same type.
    pub fn register(&mut self, backend: Arc<dyn StorageBackend>) {
        let storage_type = backend.storage_type();
        info!(storage_type = %storage_type, "Registered storage backend");
        self.backends.insert(storage_type, backend);
    }

    /// Builder method to register a backend.
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn backend(&self, storage_type: StorageType) -> StorageResult<Arc<dyn StorageBackend>> {
        self.backends
            .get(&storage_type)
            .cloned()
            .ok_or(StorageError::BackendNotConfigured(storage_type))
    }

    pub fn has_backend(&self, storage_type: StorageType) -> bool {
        self.backends.contains_key(&storage_type)
    }

    /// Validate `request` and run it against its backend.
    pub async fn execute(&self, request: &StorageRequest) -> StorageResult<StorageResponse> {
        let request_type = request.request_type();
        let storage_type = request.storage_type();

        if let Err(err) = request.validate().and_then(|_| request.check_backend()) {
            warn!(
                request_type = %request_type,
                storage_type = %storage_type,
                error = %err,
                "Rejected storage request"
            );
            return Err(err.into());
        }
        let backend = self.backend(storage_type)?;

        info!(
            request_type = %request_type,
            storage_type = %storage_type,
            path = %request.path(),
            "Executing storage request"
        );

        let response = match request {
            StorageRequest::Create(r) => StorageResponse::Object(backend.create(r).await?),
            StorageRequest::Read(r) => StorageResponse::Objects(backend.read(r).await?),
            StorageRequest::Update(r) => StorageResponse::Objects(backend.update(r).await?),
            StorageRequest::Delete(r) => StorageResponse::Deleted(backend.delete(r).await?),
            StorageRequest::List(r) => StorageResponse::Objects(backend.list(r).await?),
            StorageRequest::Search(r) => {
                let mut search = r.clone();
                search.limit.get_or_insert(self.default_search_limit);
                StorageResponse::Objects(backend.search(&search).await?)
            }
        };
        Ok(response)
    }
}
