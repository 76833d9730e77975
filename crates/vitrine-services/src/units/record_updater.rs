use crate::consumer::{DeliveryOutcome, EventConsumer};
use async_trait::async_trait;
use std::sync::Arc;
use vitrine_core::{Event, EventKind, Thumbnail};
use vitrine_db::{RecordStore, RecordStoreError};

/// Consumes `ThumbnailCreated`: patch the thumbnail URL of an existing record.
///
/// The patch may arrive before the record exists; that delivery is retried until the
/// record writer catches up.
#[derive(Clone)]
pub struct RecordUpdaterUnit {
    records: Arc<dyn RecordStore>,
}

impl RecordUpdaterUnit {
    pub const NAME: &'static str = "record-updater";
    pub const SUBSCRIBES_TO: &'static [EventKind] = &[EventKind::ThumbnailCreated];

    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    #[tracing::instrument(skip(self, thumbnail), fields(product_id = %thumbnail.product_id, media_id = %thumbnail.media_id))]
    async fn update(&self, thumbnail: Thumbnail) -> DeliveryOutcome {
        match self
            .records
            .set_thumbnail_url(&thumbnail.product_id, &thumbnail.media_id, &thumbnail.url)
            .await
        {
            Ok(()) => {
                tracing::info!(thumbnail_url = %thumbnail.url, "Thumbnail URL recorded");
                DeliveryOutcome::Completed
            }
            Err(e @ RecordStoreError::NotFound { .. }) => {
                tracing::warn!(error = %e, "Media record not written yet, retrying later");
                DeliveryOutcome::Retry(e.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to record thumbnail URL");
                DeliveryOutcome::Retry(e.to_string())
            }
        }
    }
}

#[async_trait]
impl EventConsumer for RecordUpdaterUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn subscribes_to(&self) -> &'static [EventKind] {
        Self::SUBSCRIBES_TO
    }

    async fn handle(&self, event: Event) -> DeliveryOutcome {
        match event {
            Event::ThumbnailCreated(thumbnail) => self.update(thumbnail).await,
            other => DeliveryOutcome::Discard(format!("unexpected event {}", other.kind())),
        }
    }
}
