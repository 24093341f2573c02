//! noderun storage
//!
//! Executes [`StorageRequest`](noderun_core::storage::StorageRequest)s
//! against pluggable backends. A [`StorageProvider`] owns one backend per
//! storage type and routes each request after validating it.

pub mod backend;
pub mod cas;
pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod provider;
pub mod telemetry;

pub use backend::{StorageBackend, StorageResponse};
pub use cas::MemoryContentStore;
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use fs::FilesystemStorage;
pub use memory::MemoryDatabase;
pub use provider::StorageProvider;
