use crate::consumer::{DeliveryOutcome, EventConsumer};
use async_trait::async_trait;
use std::sync::Arc;
use vitrine_bus::EventBus;
use vitrine_core::keys::thumbnail_key;
use vitrine_core::{Event, EventKind, Media, Thumbnail};
use vitrine_processing::ThumbnailGenerator;
use vitrine_storage::{Storage, StorageError};

pub const THUMBNAIL_CONTENT_TYPE: &str = "image/png";

/// Consumes `CreateThumbnail`: derive a fixed-size PNG and announce it.
#[derive(Clone)]
pub struct ThumbnailUnit {
    storage: Arc<dyn Storage>,
    bus: Arc<dyn EventBus>,
    generator: ThumbnailGenerator,
}

impl ThumbnailUnit {
    pub const NAME: &'static str = "thumbnail";
    pub const SUBSCRIBES_TO: &'static [EventKind] = &[EventKind::CreateThumbnail];

    pub fn new(storage: Arc<dyn Storage>, bus: Arc<dyn EventBus>, generator: ThumbnailGenerator) -> Self {
        Self {
            storage,
            bus,
            generator,
        }
    }

    #[tracing::instrument(skip(self, media), fields(product_id = %media.product_id, media_id = %media.id, source_key = %media.url))]
    async fn create_thumbnail(&self, media: Media) -> DeliveryOutcome {
        if !media.is_image() {
            tracing::warn!(media_type = %media.media_type, "Thumbnail requested for non-image media");
            return DeliveryOutcome::Discard(format!("{} media has no thumbnail", media.media_type));
        }

        let source = match self.storage.download(&media.url).await {
            Ok(data) => data,
            Err(StorageError::NotFound(key)) => {
                tracing::error!(key = %key, "Source blob missing, dropping thumbnail request");
                return DeliveryOutcome::Discard(format!("source blob {} not found", key));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to download source blob");
                return DeliveryOutcome::Retry(e.to_string());
            }
        };

        let generator = self.generator;
        let generated = match tokio::task::spawn_blocking(move || generator.generate(&source)).await {
            Ok(Ok(thumbnail)) => thumbnail,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Source blob is not a decodable image");
                return DeliveryOutcome::Discard(e.to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, "Thumbnail task panicked or was cancelled");
                return DeliveryOutcome::Retry(e.to_string());
            }
        };

        let key = thumbnail_key(&media.url, self.generator.width(), self.generator.height());
        let (width, height) = (generated.width, generated.height);

        if let Err(e) = self
            .storage
            .upload_with_key(&key, generated.data, THUMBNAIL_CONTENT_TYPE)
            .await
        {
            tracing::error!(error = %e, thumbnail_key = %key, "Failed to store thumbnail");
            return DeliveryOutcome::Retry(e.to_string());
        }

        // The media may have been removed while the thumbnail was being made.
        match self.storage.exists(&media.url).await {
            Ok(true) => {}
            Ok(false) => return self.withdraw(&key).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to recheck source blob");
                return DeliveryOutcome::Retry(e.to_string());
            }
        }

        let event = Event::ThumbnailCreated(Thumbnail {
            product_id: media.product_id.clone(),
            media_id: media.id.clone(),
            url: key.clone(),
            height,
            width,
        });
        if let Err(e) = self.bus.publish(&event).await {
            tracing::error!(error = %e, thumbnail_key = %key, "Failed to publish ThumbnailCreated");
            return DeliveryOutcome::Retry(e.to_string());
        }

        tracing::info!(thumbnail_key = %key, width, height, "Thumbnail created");
        DeliveryOutcome::Completed
    }

    /// Drops a thumbnail whose source is gone. Falls back to the reaper when the direct
    /// delete fails.
    async fn withdraw(&self, key: &str) -> DeliveryOutcome {
        tracing::warn!(thumbnail_key = %key, "Source removed during generation, dropping thumbnail");
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(error = %e, thumbnail_key = %key, "Failed to delete thumbnail, scheduling reap");
            if let Err(e) = self.bus.publish(&Event::RemoveObject(key.to_string())).await {
                tracing::error!(error = %e, thumbnail_key = %key, "Failed to schedule thumbnail reap");
                return DeliveryOutcome::Retry(e.to_string());
            }
        }
        DeliveryOutcome::Discard(format!("source {} removed", key))
    }
}

#[async_trait]
impl EventConsumer for ThumbnailUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn subscribes_to(&self) -> &'static [EventKind] {
        Self::SUBSCRIBES_TO
    }

    async fn handle(&self, event: Event) -> DeliveryOutcome {
        match event {
            Event::CreateThumbnail(media) => self.create_thumbnail(media).await,
            other => DeliveryOutcome::Discard(format!("unexpected event {}", other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::process_batch;
    use crate::test_support::{
        image_media, jpeg_bytes, recording_bus, FailingBus, ReadOnlyStorage,
    };
    use vitrine_bus::Delivery;
    use vitrine_core::MediaType;
    use vitrine_storage::{MemoryStorage, StorageBackend, StorageResult};

    /// Reports the source as gone once the thumbnail has been stored, as if the reaper ran
    /// in between.
    struct ReapedDuringGeneration(MemoryStorage);

    #[async_trait]
    impl Storage for ReapedDuringGeneration {
        async fn upload_with_key(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
            self.0.upload_with_key(key, data, content_type).await
        }

        async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
            self.0.download(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.0.delete(key).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            if key.ends_with(".jpg") {
                return Ok(false);
            }
            self.0.exists(key).await
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    fn generator() -> ThumbnailGenerator {
        ThumbnailGenerator::new(200, 200).unwrap()
    }

    async fn store(storage: &MemoryStorage, media: &Media, data: Vec<u8>) {
        storage
            .upload_with_key(&media.url, data, "image/jpeg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn creates_thumbnail_and_publishes() {
        let storage = MemoryStorage::new();
        let bus = recording_bus().await;
        let media = image_media("P1", "a");
        store(&storage, &media, jpeg_bytes(64, 32)).await;

        let unit = ThumbnailUnit::new(Arc::new(storage.clone()), Arc::new(bus.clone()), generator());
        let outcome = unit.handle(Event::CreateThumbnail(media)).await;
        assert_eq!(outcome, DeliveryOutcome::Completed);

        let thumbnail = storage
            .object("media/P1/a-200x200_thumbnail.png")
            .await
            .unwrap();
        assert_eq!(thumbnail.content_type, "image/png");

        let published = bus.published().await;
        assert_eq!(published.len(), 1);
        match Event::from_message(&published[0]).unwrap() {
            Event::ThumbnailCreated(t) => {
                assert_eq!(t.url, "media/P1/a-200x200_thumbnail.png");
                assert_eq!((t.width, t.height), (200, 200));
                assert_eq!(t.media_id, "a");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn undecodable_source_is_discarded() {
        let storage = MemoryStorage::new();
        let bus = recording_bus().await;
        let media = image_media("P1", "a");
        store(&storage, &media, b"garbage".to_vec()).await;

        let unit = ThumbnailUnit::new(Arc::new(storage), Arc::new(bus.clone()), generator());
        let outcome = unit.handle(Event::CreateThumbnail(media)).await;

        assert!(outcome.is_discard());
        assert!(bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_discarded() {
        let unit = ThumbnailUnit::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(recording_bus().await),
            generator(),
        );
        let outcome = unit.handle(Event::CreateThumbnail(image_media("P1", "a"))).await;
        assert!(outcome.is_discard());
    }

    #[tokio::test]
    async fn storage_and_publish_failures_are_retried() {
        let inner = MemoryStorage::new();
        let media = image_media("P1", "a");
        store(&inner, &media, jpeg_bytes(16, 16)).await;

        let read_only = ThumbnailUnit::new(
            Arc::new(ReadOnlyStorage(inner.clone())),
            Arc::new(recording_bus().await),
            generator(),
        );
        assert!(read_only
            .handle(Event::CreateThumbnail(media.clone()))
            .await
            .is_retry());

        let no_bus = ThumbnailUnit::new(Arc::new(inner), Arc::new(FailingBus::default()), generator());
        assert!(no_bus.handle(Event::CreateThumbnail(media)).await.is_retry());
    }

    #[tokio::test]
    async fn thumbnail_is_withdrawn_when_source_disappears() {
        let inner = MemoryStorage::new();
        let bus = recording_bus().await;
        let media = image_media("P1", "a");
        store(&inner, &media, jpeg_bytes(32, 32)).await;

        let unit = ThumbnailUnit::new(
            Arc::new(ReapedDuringGeneration(inner.clone())),
            Arc::new(bus.clone()),
            generator(),
        );
        let outcome = unit.handle(Event::CreateThumbnail(media)).await;

        assert!(outcome.is_discard());
        assert!(!inner.exists("media/P1/a-200x200_thumbnail.png").await.unwrap());
        assert!(bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn video_is_discarded() {
        let mut media = image_media("P1", "v");
        media.media_type = MediaType::Video;
        let unit = ThumbnailUnit::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(recording_bus().await),
            generator(),
        );
        assert!(unit.handle(Event::CreateThumbnail(media)).await.is_discard());
    }

    #[tokio::test]
    async fn bad_item_does_not_stop_the_batch() {
        let storage = MemoryStorage::new();
        let bus = recording_bus().await;
        let items = [
            (image_media("P1", "one"), jpeg_bytes(40, 40)),
            (image_media("P1", "two"), b"not an image".to_vec()),
            (image_media("P1", "three"), jpeg_bytes(10, 30)),
        ];

        let mut deliveries = Vec::new();
        for (n, (media, data)) in items.iter().enumerate() {
            store(&storage, media, data.clone()).await;
            deliveries.push(Delivery {
                message_id: format!("m{}", n),
                receipt: format!("r{}", n),
                attempt: 1,
                message: Event::CreateThumbnail(media.clone()).to_message().unwrap(),
            });
        }

        let unit = ThumbnailUnit::new(Arc::new(storage.clone()), Arc::new(bus.clone()), generator());
        let report = process_batch(&unit, &deliveries).await;

        assert_eq!(report.completed(), 2);
        assert_eq!(report.discarded(), 1);
        assert!(report.results[1].outcome.is_discard());

        let created: Vec<String> = bus
            .published()
            .await
            .iter()
            .filter_map(|m| match Event::from_message(m) {
                Ok(Event::ThumbnailCreated(t)) => Some(t.media_id),
                _ => None,
            })
            .collect();
        assert_eq!(created, vec!["one".to_string(), "three".to_string()]);
        assert!(storage.exists("media/P1/three-200x200_thumbnail.png").await.unwrap());
        assert!(!storage.exists("media/P1/two-200x200_thumbnail.png").await.unwrap());
    }
}
