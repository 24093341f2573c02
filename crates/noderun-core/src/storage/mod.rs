//! Storage addressing and request types.
//!
//! These describe *what* to do against a backend; executing them is the job
//! of `noderun-storage`.

mod location;
mod options;
mod request;

pub use location::{StorageLocation, StorageMetadata, StorageObject, StorageType};
pub use options::{
    DatabaseReadOptions, IpfsOptions, IpnsOperation, OrderDirection, StorageOptions,
};
pub use request::{
    CreateRequest, DeleteRequest, InputStream, ListRequest, ReadRequest, RequestTarget,
    SearchRequest, StoragePayload, StorageRequest, StorageRequestType, UpdateRequest,
};
