//! Filesystem backend rooted at a directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use noderun_core::storage::{
    CreateRequest, DeleteRequest, ListRequest, ReadRequest, SearchRequest, StorageLocation,
    StorageMetadata, StorageObject, StorageType, UpdateRequest,
};
use noderun_core::CoreError;
use serde_json::Value;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::backend::{create_bytes, decode_stored, sha256_hex, StorageBackend};
use crate::error::{StorageError, StorageResult};

/// Stores objects as files below `root`.
///
/// Request paths are relative to the root; absolute paths and `..`
/// components are rejected.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(CoreError::validation(format!(
                        "path '{path}' escapes the storage root"
                    ))
                    .into())
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// Resolve a path naming an entry below the root, never the root itself.
    fn resolve_entry(&self, path: &str) -> StorageResult<PathBuf> {
        let full = self.resolve(path)?;
        if !Path::new(path)
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
        {
            return Err(CoreError::validation(format!(
                "path '{path}' does not name an entry below the storage root"
            ))
            .into());
        }
        Ok(full)
    }

    /// Write `bytes` to a new file, or truncate an existing one when
    /// `create` is false.
    async fn write(&self, path: &str, bytes: &[u8], create: bool) -> StorageResult<StorageObject> {
        let full = self.resolve_entry(path)?;
        let mut options = OpenOptions::new();
        options.write(true);
        if create {
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            options.create_new(true);
        } else {
            options.truncate(true);
        }
        let mut file = options.open(&full).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::AlreadyExists => {
                StorageError::backend(format!("file '{path}' already exists"))
            }
            _ => not_found(path, err),
        })?;
        file.write_all(bytes).await?;
        file.flush().await?;
        debug!(path = %full.display(), size = bytes.len(), "Wrote file");
        let (_, content_type) = decode_stored(bytes);
        Ok(StorageObject::new(location(path), None).with_metadata(StorageMetadata {
            content_type: Some(content_type.to_string()),
            size: Some(bytes.len() as u64),
            checksum: Some(sha256_hex(bytes)),
            modified_at: Some(Utc::now().to_rfc3339()),
            ..Default::default()
        }))
    }
}

fn location(path: &str) -> StorageLocation {
    StorageLocation::new(StorageType::Filesystem, path)
}

fn not_found(path: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::not_found(format!("file '{path}'"))
    } else {
        StorageError::Io(err)
    }
}

async fn entry_metadata(full: &Path) -> StorageResult<StorageMetadata> {
    let meta = tokio::fs::metadata(full).await?;
    let modified_at = meta
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
    Ok(StorageMetadata {
        content_type: Some(if meta.is_dir() { "directory" } else { "file" }.to_string()),
        size: Some(meta.len()),
        modified_at,
        ..Default::default()
    })
}

fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    fn storage_type(&self) -> StorageType {
        StorageType::Filesystem
    }

    async fn create(&self, request: &CreateRequest) -> StorageResult<StorageObject> {
        let bytes = create_bytes(request)?;
        self.write(&request.target.path, &bytes, true).await
    }

    async fn read(&self, request: &ReadRequest) -> StorageResult<Vec<StorageObject>> {
        let path = &request.target.path;
        let full = self.resolve_entry(path)?;
        let bytes = tokio::fs::read(&full).await.map_err(|e| not_found(path, e))?;
        let (data, content_type) = decode_stored(&bytes);
        let object = StorageObject::new(location(path), Some(data)).with_metadata(StorageMetadata {
            content_type: Some(content_type.to_string()),
            size: Some(bytes.len() as u64),
            checksum: Some(sha256_hex(&bytes)),
            ..entry_metadata(&full).await?
        });
        Ok(vec![object])
    }

    async fn update(&self, request: &UpdateRequest) -> StorageResult<Vec<StorageObject>> {
        let bytes = match &request.data {
            Some(data) => data.to_bytes()?,
            None => return Err(StorageError::backend("update request carries no data")),
        };
        Ok(vec![self.write(&request.target.path, &bytes, false).await?])
    }

    async fn delete(&self, request: &DeleteRequest) -> StorageResult<usize> {
        let path = &request.target.path;
        let full = self.resolve_entry(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| not_found(path, e))?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&full).await?;
        } else {
            tokio::fs::remove_file(&full).await?;
        }
        debug!(path = %full.display(), "Deleted");
        Ok(1)
    }

    async fn list(&self, request: &ListRequest) -> StorageResult<Vec<StorageObject>> {
        let path = &request.target.path;
        let full = self.resolve(path)?;
        let mut entries = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| not_found(path, e))?;

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry_metadata(&entry.path()).await?;
            objects.push(
                StorageObject::new(location(&join_relative(path, &name)), None)
                    .with_metadata(metadata),
            );
        }
        objects.sort_by(|a, b| a.location.path.cmp(&b.location.path));
        Ok(objects)
    }

    /// Match file names in the directory against the query text.
    async fn search(&self, request: &SearchRequest) -> StorageResult<Vec<StorageObject>> {
        let needle = match &request.query {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        let listing = self
            .list(&ListRequest {
                target: request.target.clone(),
            })
            .await?;
        Ok(listing
            .into_iter()
            .filter(|o| {
                Path::new(&o.location.path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .take(request.limit.unwrap_or(usize::MAX))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_core::storage::{InputStream, StorageRequest};
    use serde_json::json;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FilesystemStorage) {
        let dir = TempDir::new().unwrap();
        let fs = FilesystemStorage::new(dir.path());
        (dir, fs)
    }

    fn create(path: &str, bytes: Vec<u8>) -> CreateRequest {
        match StorageRequest::create(StorageType::Filesystem, path, bytes).unwrap() {
            StorageRequest::Create(create) => create,
            _ => unreachable!(),
        }
    }

    fn read(path: &str) -> ReadRequest {
        match StorageRequest::read(StorageType::Filesystem, path) {
            StorageRequest::Read(read) => read,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_bytes_round_trip() {
        let (_dir, fs) = storage();
        let written = fs.create(&create("out/a.bin", vec![0xff, 0x00])).await.unwrap();
        assert_eq!(written.metadata.size, Some(2));
        assert_eq!(written.location.uri(), "fs://out/a.bin");

        let objects = fs.read(&read("out/a.bin")).await.unwrap();
        assert_eq!(objects[0].data, Some(json!("/wA=")));
        assert_eq!(
            objects[0].metadata.content_type.as_deref(),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn test_json_document_read_back() {
        let (_dir, fs) = storage();
        let StorageRequest::Create(request) = StorageRequest::create_from_stream(
            StorageType::Filesystem,
            "doc.json",
            InputStream::from_bytes(br#"{"name":"test"}"#.to_vec()),
        )
        .unwrap() else {
            unreachable!()
        };
        fs.create(&request).await.unwrap();
        let objects = fs.read(&read("doc.json")).await.unwrap();
        assert_eq!(objects[0].data, Some(json!({"name": "test"})));
    }

    #[tokio::test]
    async fn test_create_refuses_overwrite() {
        let (_dir, fs) = storage();
        fs.create(&create("a.txt", b"one".to_vec())).await.unwrap();
        let err = fs.create(&create("a.txt", b"two".to_vec())).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let (_dir, fs) = storage();
        let err = fs.read(&read("../etc/passwd")).await.unwrap_err();
        assert!(matches!(err, StorageError::Core(CoreError::Validation(_))));
        assert!(fs.read(&read("/etc/passwd")).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_not_found() {
        let (_dir, fs) = storage();
        let err = fs.read(&read("nope.txt")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_list_search_delete() {
        let (_dir, fs) = storage();
        fs.create(&create("docs/report.txt", b"v1".to_vec())).await.unwrap();
        fs.create(&create("docs/notes.txt", b"n".to_vec())).await.unwrap();

        let StorageRequest::Update(update) =
            StorageRequest::update(StorageType::Filesystem, "docs/report.txt", b"v2".to_vec())
                .unwrap()
        else {
            unreachable!()
        };
        fs.update(&update).await.unwrap();
        let objects = fs.read(&read("docs/report.txt")).await.unwrap();
        assert_eq!(objects[0].metadata.checksum, Some(sha256_hex(b"v2")));

        let StorageRequest::List(list) = StorageRequest::list(StorageType::Filesystem, "docs")
        else {
            unreachable!()
        };
        let paths: Vec<_> = fs
            .list(&list)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.location.path)
            .collect();
        assert_eq!(paths, vec!["docs/notes.txt", "docs/report.txt"]);

        let StorageRequest::Search(search) =
            StorageRequest::search(StorageType::Filesystem, "docs", "REPORT").unwrap()
        else {
            unreachable!()
        };
        assert_eq!(fs.search(&search).await.unwrap().len(), 1);

        let StorageRequest::Delete(delete) =
            StorageRequest::delete(StorageType::Filesystem, "docs", None)
        else {
            unreachable!()
        };
        assert_eq!(fs.delete(&delete).await.unwrap(), 1);
        assert!(fs.list(&list).await.is_err());
    }

    #[tokio::test]
    async fn test_root_cannot_be_deleted_or_written() {
        let (dir, fs) = storage();
        fs.create(&create("keep.txt", b"keep".to_vec())).await.unwrap();

        for path in ["", ".", "./"] {
            let StorageRequest::Delete(delete) =
                StorageRequest::delete(StorageType::Filesystem, path, None)
            else {
                unreachable!()
            };
            let err = fs.delete(&delete).await.unwrap_err();
            assert!(matches!(err, StorageError::Core(CoreError::Validation(_))));
        }
        let err = fs.create(&create(".", b"x".to_vec())).await.unwrap_err();
        assert!(matches!(err, StorageError::Core(CoreError::Validation(_))));
        assert!(dir.path().join("keep.txt").exists());

        let StorageRequest::List(list) = StorageRequest::list(StorageType::Filesystem, "") else {
            unreachable!()
        };
        assert_eq!(fs.list(&list).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_one_wins() {
        let (dir, fs) = storage();
        let first = create("race.txt", b"first".to_vec());
        let second = create("race.txt", b"second".to_vec());
        let (a, b) = tokio::join!(fs.create(&first), fs.create(&second));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let winner = if a.is_ok() { "first" } else { "second" };
        let stored = std::fs::read(dir.path().join("race.txt")).unwrap();
        assert_eq!(stored, winner.as_bytes());
    }

    #[tokio::test]
    async fn test_update_missing_file_not_found() {
        let (_dir, fs) = storage();
        let StorageRequest::Update(update) =
            StorageRequest::update(StorageType::Filesystem, "missing.txt", b"v".to_vec()).unwrap()
        else {
            unreachable!()
        };
        let err = fs.update(&update).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
