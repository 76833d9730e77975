//! Filesystem blob store. Keys map to paths below a base directory.

use crate::traits::{validate_key, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

fn describe(action: &str, path: &Path, err: std::io::Error) -> String {
    format!("could not {} {}: {}", action, path.display(), err)
}

impl LocalStorage {
    /// Opens a store rooted at `root`, creating the directory when needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if let Err(e) = fs::create_dir_all(&root).await {
            return Err(StorageError::ConfigError(describe(
                "create storage directory",
                &root,
                e,
            )));
        }
        Ok(Self { root })
    }

    pub fn base_path(&self) -> &Path {
        &self.root
    }

    /// Symlinks inside the root may not lead out of it.
    fn resolve(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        let candidate = self.root.join(storage_key);

        let root = self
            .root
            .canonicalize()
            .map_err(|e| StorageError::ConfigError(describe("resolve", &self.root, e)))?;

        match candidate.canonicalize() {
            Ok(resolved) if !resolved.starts_with(&root) => Err(StorageError::InvalidKey(
                format!("{} points outside the storage directory", storage_key),
            )),
            _ => Ok(candidate),
        }
    }

    async fn is_file(path: &Path) -> StorageResult<bool> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    /// Writes to a sibling temp file and renames it into place so readers never see a
    /// partial blob.
    async fn write_atomically(path: &Path, data: &[u8]) -> Result<(), String> {
        let staging = path.with_extension("partial");

        let mut file = fs::File::create(&staging)
            .await
            .map_err(|e| describe("create", &staging, e))?;
        file.write_all(data)
            .await
            .map_err(|e| describe("write", &staging, e))?;
        file.sync_all()
            .await
            .map_err(|e| describe("sync", &staging, e))?;
        drop(file);

        fs::rename(&staging, path)
            .await
            .map_err(|e| describe("move into place", path, e))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;
        let started = Instant::now();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        Self::write_atomically(&path, &data)
            .await
            .map_err(StorageError::UploadFailed)?;

        tracing::info!(
            key = %storage_key,
            content_type = %content_type,
            size_bytes = data.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Wrote blob to disk"
        );
        Ok(())
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(storage_key)?;

        match fs::read(&path).await {
            Ok(data) => {
                tracing::debug!(key = %storage_key, size_bytes = data.len(), "Read blob from disk");
                Ok(data)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(describe("read", &path, e))),
        }
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %storage_key, "Removed blob from disk");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(key = %storage_key, "Blob already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed(describe("remove", &path, e))),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Self::is_file(&path).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn writes_nested_keys_and_reads_them_back() {
        let (dir, storage) = store().await;

        storage
            .upload_with_key("media/P1/abc.jpg", b"jpeg bytes".to_vec(), "image/jpeg")
            .await
            .unwrap();

        assert!(dir.path().join("media/P1/abc.jpg").is_file());
        assert!(!dir.path().join("media/P1/abc.partial").exists());
        assert_eq!(
            storage.download("media/P1/abc.jpg").await.unwrap(),
            b"jpeg bytes"
        );
    }

    #[tokio::test]
    async fn overwrite_replaces_content() {
        let (_dir, storage) = store().await;

        storage
            .upload_with_key("media/P1/a.png", b"old".to_vec(), "image/png")
            .await
            .unwrap();
        storage
            .upload_with_key("media/P1/a.png", b"new".to_vec(), "image/png")
            .await
            .unwrap();

        assert_eq!(storage.download("media/P1/a.png").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn escaping_keys_are_refused() {
        let (_dir, storage) = store().await;

        assert!(matches!(
            storage.download("../../../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.delete("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.exists("/etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, storage) = store().await;

        storage.delete("media/P1/never-existed.png").await.unwrap();

        storage
            .upload_with_key("media/P1/a.png", b"x".to_vec(), "image/png")
            .await
            .unwrap();
        storage.delete("media/P1/a.png").await.unwrap();
        storage.delete("media/P1/a.png").await.unwrap();
        assert!(!storage.exists("media/P1/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let (_dir, storage) = store().await;

        let result = storage.download("media/P1/missing.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(key)) if key == "media/P1/missing.jpg"));
    }
}
