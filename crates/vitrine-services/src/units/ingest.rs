use std::sync::Arc;
use vitrine_bus::EventBus;
use vitrine_core::keys::{generate_media_id, media_storage_key};
use vitrine_core::validation::{
    normalize_content_type, validate_content_type, validate_file_size, validate_product_id,
};
use vitrine_core::{AppError, Event, Media};
use vitrine_storage::Storage;

/// A single uploaded file as received by the gateway.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub product_id: String,
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Stores uploaded bytes and announces the new media on the bus.
#[derive(Clone)]
pub struct IngestUnit {
    storage: Arc<dyn Storage>,
    bus: Arc<dyn EventBus>,
    media_prefix: String,
    max_file_size: usize,
}

impl IngestUnit {
    pub fn new(
        storage: Arc<dyn Storage>,
        bus: Arc<dyn EventBus>,
        media_prefix: impl Into<String>,
        max_file_size: usize,
    ) -> Self {
        Self {
            storage,
            bus,
            media_prefix: media_prefix.into(),
            max_file_size,
        }
    }

    /// Validate, store and publish.
    ///
    /// The blob is written before anything is published. Publishing is not
    /// transactional with the store: if a publish fails the blob stays and the call
    /// reports an internal error.
    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id, content_type = %request.content_type, size_bytes = request.data.len()))]
    pub async fn ingest(&self, request: UploadRequest) -> Result<Media, AppError> {
        validate_product_id(&request.product_id)?;
        let media_type = validate_content_type(&request.content_type)?;
        validate_file_size(request.data.len(), self.max_file_size)?;

        let media_id = generate_media_id();
        let storage_key = media_storage_key(
            &self.media_prefix,
            &request.product_id,
            &media_id,
            request.filename.as_deref().unwrap_or(""),
        );

        self.storage
            .upload_with_key(
                &storage_key,
                request.data,
                &normalize_content_type(&request.content_type),
            )
            .await?;

        let media = Media {
            id: media_id,
            product_id: request.product_id,
            media_type,
            url: storage_key,
            timestamp: chrono::Utc::now().timestamp(),
            thumbnail_url: None,
        };

        let mut events = vec![Event::MediaUploaded(media.clone())];
        if media.is_image() {
            events.push(Event::CreateThumbnail(media.clone()));
        }

        let mut failures = Vec::new();
        for event in &events {
            if let Err(e) = self.bus.publish(event).await {
                tracing::error!(
                    error = %e,
                    event = %event.kind(),
                    media_id = %media.id,
                    storage_key = %media.url,
                    "Failed to publish event after upload"
                );
                failures.push(format!("{}: {}", event.kind(), e));
            }
        }

        if !failures.is_empty() {
            return Err(AppError::Bus(failures.join("; ")));
        }

        tracing::info!(
            media_id = %media.id,
            media_type = %media.media_type,
            storage_key = %media.url,
            "Media ingested"
        );
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg_bytes, kinds, recording_bus, FailingBus};
    use vitrine_core::{EventKind, MediaType};
    use vitrine_storage::MemoryStorage;

    const MAX: usize = 1024 * 1024;

    fn request(content_type: &str, filename: &str, data: Vec<u8>) -> UploadRequest {
        UploadRequest {
            product_id: "P1".to_string(),
            filename: Some(filename.to_string()),
            content_type: content_type.to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn image_upload_publishes_both_events() {
        let storage = MemoryStorage::new();
        let bus = recording_bus().await;
        let unit = IngestUnit::new(Arc::new(storage.clone()), Arc::new(bus.clone()), "media", MAX);

        let media = unit
            .ingest(request("image/jpeg", "Photo.JPG", jpeg_bytes(8, 8)))
            .await
            .unwrap();

        assert_eq!(media.media_type, MediaType::Image);
        assert_eq!(media.url, format!("media/P1/{}.jpg", media.id));
        assert_eq!(media.id.len(), 32);
        assert!(media.thumbnail_url.is_none());

        let stored = storage.object(&media.url).await.unwrap();
        assert_eq!(stored.content_type, "image/jpeg");

        let published = bus.published().await;
        assert_eq!(
            kinds(&published),
            vec![EventKind::MediaUploaded, EventKind::CreateThumbnail]
        );
        match Event::from_message(&published[0]).unwrap() {
            Event::MediaUploaded(m) => assert_eq!(m, media),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn supported_types_map_to_media_type() {
        let cases = [
            ("image/gif", MediaType::Image),
            ("image/jpeg", MediaType::Image),
            ("image/jpg", MediaType::Image),
            ("IMAGE/PNG; charset=binary", MediaType::Image),
            ("video/mp4", MediaType::Video),
        ];
        for (content_type, expected) in cases {
            let bus = recording_bus().await;
            let unit = IngestUnit::new(
                Arc::new(MemoryStorage::new()),
                Arc::new(bus.clone()),
                "media",
                MAX,
            );
            let media = unit
                .ingest(request(content_type, "f.bin", vec![1, 2, 3]))
                .await
                .unwrap();
            assert_eq!(media.media_type, expected, "{}", content_type);

            let expected_events = if expected == MediaType::Image { 2 } else { 1 };
            assert_eq!(bus.published().await.len(), expected_events, "{}", content_type);
        }
    }

    #[tokio::test]
    async fn unsupported_type_has_no_side_effect() {
        let storage = MemoryStorage::new();
        let bus = recording_bus().await;
        let unit = IngestUnit::new(Arc::new(storage.clone()), Arc::new(bus.clone()), "media", MAX);

        let err = unit
            .ingest(request("application/pdf", "doc.pdf", vec![1, 2, 3]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(storage.is_empty().await);
        assert!(bus.published().await.is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_bodies() {
        let unit = IngestUnit::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(recording_bus().await),
            "media",
            4,
        );

        let empty = unit.ingest(request("image/png", "a.png", Vec::new())).await;
        assert!(matches!(empty, Err(AppError::InvalidInput(_))));

        let large = unit.ingest(request("image/png", "a.png", vec![0; 5])).await;
        assert!(matches!(large, Err(AppError::PayloadTooLarge(_))));
    }

    #[tokio::test]
    async fn rejects_bad_product_id() {
        let unit = IngestUnit::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(recording_bus().await),
            "media",
            MAX,
        );
        let mut req = request("image/png", "a.png", vec![1]);
        req.product_id = "../P1".to_string();
        assert!(matches!(
            unit.ingest(req).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn publish_failure_keeps_blob_and_attempts_every_event() {
        let storage = MemoryStorage::new();
        let bus = Arc::new(FailingBus::default());
        let unit = IngestUnit::new(Arc::new(storage.clone()), bus.clone(), "media", MAX);

        let err = unit
            .ingest(request("image/png", "a.png", vec![1, 2, 3]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Bus(_)));
        assert_eq!(bus.attempts(), 2);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn missing_extension_is_omitted() {
        let storage = MemoryStorage::new();
        let unit = IngestUnit::new(
            Arc::new(storage.clone()),
            Arc::new(recording_bus().await),
            "media",
            MAX,
        );
        let mut req = request("video/mp4", "", vec![1]);
        req.filename = None;
        let media = unit.ingest(req).await.unwrap();
        assert_eq!(media.url, format!("media/P1/{}", media.id));
    }
}
