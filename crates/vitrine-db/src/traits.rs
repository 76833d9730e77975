use crate::error::RecordStoreResult;
use async_trait::async_trait;
use vitrine_core::{ArtifactKeys, Media, MediaRecord};

/// Keyed media record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create or overwrite the record for `media`, leaving any stored thumbnail URL intact.
    async fn upsert_media(&self, media: &Media) -> RecordStoreResult<()>;

    /// Set the thumbnail URL of an existing record.
    ///
    /// Returns [`RecordStoreError::NotFound`](crate::RecordStoreError::NotFound) when no
    /// record exists yet; callers treat that as retryable.
    async fn set_thumbnail_url(
        &self,
        product_id: &str,
        media_id: &str,
        thumbnail_url: &str,
    ) -> RecordStoreResult<()>;

    /// Projection of the artifact keys, or `None` when the record is absent.
    async fn artifact_keys(
        &self,
        product_id: &str,
        media_id: &str,
    ) -> RecordStoreResult<Option<ArtifactKeys>>;

    /// Delete the record if it exists.
    async fn delete_media(&self, product_id: &str, media_id: &str) -> RecordStoreResult<()>;

    /// All records of a product, ordered by media id.
    async fn list_by_product(&self, product_id: &str) -> RecordStoreResult<Vec<MediaRecord>>;

    async fn get_media(
        &self,
        product_id: &str,
        media_id: &str,
    ) -> RecordStoreResult<Option<MediaRecord>>;

    /// Cheap connectivity check.
    async fn health_check(&self) -> RecordStoreResult<()>;
}
