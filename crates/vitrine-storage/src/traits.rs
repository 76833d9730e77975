//! The blob store seam shared by every backend.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;
use vitrine_core::AppError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not store blob: {0}")]
    UploadFailed(String),

    #[error("Could not fetch blob: {0}")]
    DownloadFailed(String),

    #[error("Could not remove blob: {0}")]
    DeleteFailed(String),

    #[error("No blob stored under {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Blob store failure: {0}")]
    BackendError(String),

    #[error("Blob store I/O: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Blob store misconfigured: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether retrying the same operation can succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            StorageError::NotFound(_) | StorageError::InvalidKey(_) | StorageError::ConfigError(_)
        )
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Internal(format!("Blob store I/O: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Blob store abstraction
///
/// Units only ever address blobs by key. `delete` of a missing key succeeds so that
/// reaping is idempotent.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key`, replacing any existing blob.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a blob by its storage key; a missing blob is not an error
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    fn backend_type(&self) -> StorageBackend;
}

/// Reject keys that could escape the bucket or base directory.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
