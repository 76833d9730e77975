use crate::consumer::{DeliveryOutcome, EventConsumer};
use async_trait::async_trait;
use std::sync::Arc;
use vitrine_core::{Event, EventKind, Media};
use vitrine_db::RecordStore;

/// Consumes `MediaUploaded`: upsert the media record, never touching its thumbnail URL.
#[derive(Clone)]
pub struct RecordWriterUnit {
    records: Arc<dyn RecordStore>,
}

impl RecordWriterUnit {
    pub const NAME: &'static str = "record-writer";
    pub const SUBSCRIBES_TO: &'static [EventKind] = &[EventKind::MediaUploaded];

    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    #[tracing::instrument(skip(self, media), fields(product_id = %media.product_id, media_id = %media.id))]
    async fn write(&self, media: Media) -> DeliveryOutcome {
        match self.records.upsert_media(&media).await {
            Ok(()) => {
                tracing::info!(media_type = %media.media_type, "Media record written");
                DeliveryOutcome::Completed
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to write media record");
                DeliveryOutcome::Retry(e.to_string())
            }
        }
    }
}

#[async_trait]
impl EventConsumer for RecordWriterUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn subscribes_to(&self) -> &'static [EventKind] {
        Self::SUBSCRIBES_TO
    }

    async fn handle(&self, event: Event) -> DeliveryOutcome {
        match event {
            Event::MediaUploaded(media) => self.write(media).await,
            other => DeliveryOutcome::Discard(format!("unexpected event {}", other.kind())),
        }
    }
}
