//! Shared fixtures and failing doubles for unit tests.

use async_trait::async_trait;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use vitrine_bus::{BusError, BusResult, EventBus, MemoryBus, SubscriptionSpec};
use vitrine_core::{EventKind, EventMessage, Media, MediaType};
use vitrine_storage::{MemoryStorage, Storage, StorageBackend, StorageError, StorageResult};

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 30, 30]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();
    buffer.into_inner()
}

pub fn image_media(product_id: &str, id: &str) -> Media {
    Media {
        id: id.to_string(),
        product_id: product_id.to_string(),
        media_type: MediaType::Image,
        url: format!("media/{}/{}.jpg", product_id, id),
        timestamp: 1_700_000_000,
        thumbnail_url: None,
    }
}

/// Bus with one catch-all subscription so tests can inspect what was published.
pub async fn recording_bus() -> MemoryBus {
    MemoryBus::default()
        .recording()
        .with_subscriptions([SubscriptionSpec::new("all", Vec::<EventKind>::new())])
        .await
}

pub fn kinds(messages: &[EventMessage]) -> Vec<EventKind> {
    messages.iter().filter_map(|m| m.kind().ok()).collect()
}

/// Publisher that always fails, counting attempts.
#[derive(Default)]
pub struct FailingBus {
    pub attempts: AtomicUsize,
}

impl FailingBus {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventBus for FailingBus {
    async fn publish_message(&self, _message: EventMessage) -> BusResult<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BusError::Publish("topic unavailable".to_string()))
    }
}

/// Storage that serves reads from an inner memory store and fails every write.
pub struct ReadOnlyStorage(pub MemoryStorage);

#[async_trait]
impl Storage for ReadOnlyStorage {
    async fn upload_with_key(&self, _key: &str, _data: Vec<u8>, _ct: &str) -> StorageResult<()> {
        Err(StorageError::UploadFailed("bucket unavailable".to_string()))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.0.download(storage_key).await
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::DeleteFailed("bucket unavailable".to_string()))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.0.exists(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
