#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{MemoryStorage, Storage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use vitrine_core::Config;

fn missing(setting: &str) -> StorageError {
    StorageError::ConfigError(format!("{} must be set for this storage backend", setting))
}

#[allow(dead_code)]
fn not_compiled(backend: StorageBackend, feature: &str) -> StorageError {
    StorageError::ConfigError(format!(
        "{} storage requires building with the `{}` feature",
        backend, feature
    ))
}

/// Builds the blob store selected by `STORAGE_BACKEND`.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let backend = config.storage_backend();
    tracing::info!(backend = %backend, "Initializing blob storage");

    let storage: Arc<dyn Storage> = match backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let root = config
                .local_storage_path()
                .ok_or_else(|| missing("LOCAL_STORAGE_PATH"))?;
            Arc::new(LocalStorage::new(root).await?)
        }
        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => return Err(not_compiled(backend, "storage-local")),

        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config.s3_bucket().ok_or_else(|| missing("S3_BUCKET"))?;
            let region = config
                .s3_region()
                .or_else(|| config.aws_region())
                .ok_or_else(|| missing("S3_REGION or AWS_REGION"))?;
            Arc::new(
                S3Storage::new(
                    bucket.to_string(),
                    region.to_string(),
                    config.s3_endpoint().map(String::from),
                )
                .await?,
            )
        }
        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => return Err(not_compiled(backend, "storage-s3")),
    };

    Ok(storage)
}
