use std::sync::Arc;
use vitrine_bus::EventBus;
use vitrine_core::{AppError, Event};
use vitrine_db::RecordStore;

/// Deletes a media record and schedules removal of its blobs.
///
/// `RemoveObject` is published for every stored key before the record is deleted, so a
/// crash in between leaves a record that a retried delete can still find. An image whose
/// thumbnail is not recorded yet also gets its future thumbnail key reaped, since the
/// thumbnail unit may store it after the record is gone.
#[derive(Clone)]
pub struct RemovalUnit {
    records: Arc<dyn RecordStore>,
    bus: Arc<dyn EventBus>,
    thumbnail_size: (u32, u32),
}

impl RemovalUnit {
    pub fn new(records: Arc<dyn RecordStore>, bus: Arc<dyn EventBus>, thumbnail_size: (u32, u32)) -> Self {
        Self {
            records,
            bus,
            thumbnail_size,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, product_id: &str, media_id: &str) -> Result<(), AppError> {
        let artifacts = self
            .records
            .artifact_keys(product_id, media_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Media {} not found for product {}", media_id, product_id))
            })?;

        let (width, height) = self.thumbnail_size;
        let mut keys = artifacts.keys();
        keys.extend(artifacts.pending_thumbnail(width, height));

        let mut published = 0usize;
        for key in &keys {
            match self.bus.publish(&Event::RemoveObject(key.clone())).await {
                Ok(_) => published += 1,
                Err(e) => {
                    tracing::error!(error = %e, storage_key = %key, "Failed to publish RemoveObject");
                }
            }
        }

        self.records.delete_media(product_id, media_id).await?;

        tracing::info!(removal_events = published, "Media record deleted");
        Ok(())
    }
}
