//! S3 (and S3-compatible) blob store on top of `object_store`.

use crate::traits::{validate_key, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, Error as ObjectStoreError, ObjectStore, ObjectStoreExt,
    PutOptions, PutPayload,
};
use std::time::Instant;

#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn object_path(storage_key: &str) -> StorageResult<Path> {
    validate_key(storage_key)?;
    Ok(Path::from(storage_key))
}

impl S3Storage {
    /// Credentials come from the environment. `endpoint_url` targets S3-compatible
    /// providers such as MinIO or LocalStack; plain `http://` endpoints are allowed.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(&bucket);

        let builder = match endpoint_url {
            Some(endpoint) => {
                let allow_http = endpoint.starts_with("http://");
                builder.with_endpoint(endpoint).with_allow_http(allow_http)
            }
            None => builder,
        };

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Invalid S3 configuration: {}", e)))?;

        tracing::info!(bucket = %bucket, "S3 blob store ready");
        Ok(Self { store, bucket })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let location = object_path(storage_key)?;
        let size_bytes = data.len();
        let start = Instant::now();

        let attributes = Attributes::from_iter([(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        )]);
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        if let Err(e) = self
            .store
            .put_opts(&location, PutPayload::from(Bytes::from(data)), options)
            .await
        {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes,
                duration_ms = elapsed_ms(start),
                "S3 put failed"
            );
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            size_bytes,
            duration_ms = elapsed_ms(start),
            "Stored object in S3"
        );
        Ok(())
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let location = object_path(storage_key)?;
        let start = Instant::now();

        let object = match self.store.get(&location).await {
            Ok(object) => object,
            Err(ObjectStoreError::NotFound { .. }) => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = elapsed_ms(start),
                    "S3 get failed"
                );
                return Err(StorageError::DownloadFailed(e.to_string()));
            }
        };

        let bytes = object
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len(),
            duration_ms = elapsed_ms(start),
            "Fetched object from S3"
        );
        Ok(bytes.to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let location = object_path(storage_key)?;
        let start = Instant::now();

        match self.store.delete(&location).await {
            Ok(()) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = elapsed_ms(start),
                    "Deleted object from S3"
                );
                Ok(())
            }
            // Some S3-compatible providers answer 404 where AWS answers 204.
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %storage_key, "S3 object already absent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = elapsed_ms(start),
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = object_path(storage_key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
