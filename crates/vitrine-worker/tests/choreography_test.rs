use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use vitrine_bus::{EventBus, MemoryBus};
use vitrine_core::{Event, EventKind, Media, MediaType, Thumbnail};
use vitrine_db::{MemoryRecordStore, RecordStore};
use vitrine_services::{pipeline_subscriptions, EventConsumer, Pipeline, PipelineSettings, UploadRequest};
use vitrine_storage::{MemoryStorage, Storage};
use vitrine_worker::{drain_until_idle, PipelineWorker, PipelineWorkerConfig};

struct Harness {
    storage: MemoryStorage,
    records: MemoryRecordStore,
    bus: MemoryBus,
    pipeline: Pipeline,
}

impl Harness {
    async fn new() -> Self {
        let storage = MemoryStorage::new();
        let records = MemoryRecordStore::new();
        let bus = MemoryBus::new(5)
            .recording()
            .with_subscriptions(pipeline_subscriptions())
            .await;
        let pipeline = Pipeline::new(
            Arc::new(storage.clone()),
            Arc::new(records.clone()),
            Arc::new(bus.clone()),
            PipelineSettings {
                static_url: "https://cdn.test/".to_string(),
                ..PipelineSettings::default()
            },
        )
        .unwrap();

        Self {
            storage,
            records,
            bus,
            pipeline,
        }
    }

    fn consumer(&self, name: &str) -> Arc<dyn EventConsumer> {
        self.pipeline
            .consumers()
            .into_iter()
            .find(|c| c.name() == name)
            .unwrap()
    }

    async fn drain(&self) {
        drain_until_idle(&self.bus, &self.pipeline.consumers(), 10, 20).await;
        assert!(self.bus.is_idle().await);
    }
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([90, 160, 20]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();
    buffer.into_inner()
}

fn media(id: &str) -> Media {
    Media {
        id: id.to_string(),
        product_id: "P1".to_string(),
        media_type: MediaType::Image,
        url: format!("media/P1/{}.jpg", id),
        timestamp: 1_700_000_000,
        thumbnail_url: None,
    }
}

#[tokio::test]
async fn duplicated_media_uploaded_writes_one_record() {
    let h = Harness::new().await;
    let m = media("a");
    for _ in 0..3 {
        h.bus.publish(&Event::MediaUploaded(m.clone())).await.unwrap();
    }
    h.drain().await;

    let records = h.records.list_by_product("P1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "media/P1/a.jpg");
}

#[tokio::test]
async fn thumbnail_created_before_media_uploaded_converges() {
    let h = Harness::new().await;
    let thumbnail = Thumbnail {
        product_id: "P1".to_string(),
        media_id: "a".to_string(),
        url: "media/P1/a-200x200_thumbnail.png".to_string(),
        height: 200,
        width: 200,
    };

    h.bus
        .publish(&Event::ThumbnailCreated(thumbnail))
        .await
        .unwrap();

    // Only the updater runs first: the record does not exist yet.
    let updater = h.consumer("record-updater");
    let first = drain_until_idle(&h.bus, &[updater], 10, 1).await;
    assert_eq!(first.retried, 1);
    assert_eq!(h.bus.pending_count("record-updater").await, 1);

    h.bus.publish(&Event::MediaUploaded(media("a"))).await.unwrap();
    h.drain().await;

    let record = h.records.get_media("P1", "a").await.unwrap().unwrap();
    assert_eq!(record.url, "media/P1/a.jpg");
    assert_eq!(
        record.thumbnail_url.as_deref(),
        Some("media/P1/a-200x200_thumbnail.png")
    );
    assert!(h.bus.dead_letters("record-updater").await.is_empty());
}

#[tokio::test]
async fn orphan_thumbnail_patch_is_dead_lettered() {
    let h = Harness::new().await;
    h.bus
        .publish(&Event::ThumbnailCreated(Thumbnail {
            product_id: "P1".to_string(),
            media_id: "ghost".to_string(),
            url: "media/P1/ghost-200x200_thumbnail.png".to_string(),
            height: 200,
            width: 200,
        }))
        .await
        .unwrap();

    let report = drain_until_idle(&h.bus, &h.pipeline.consumers(), 10, 20).await;

    assert_eq!(report.retried, 5);
    assert_eq!(h.bus.dead_letters("record-updater").await.len(), 1);
    assert!(h.records.is_empty().await);
}

#[tokio::test]
async fn undecodable_image_does_not_block_batch_mates() {
    let h = Harness::new().await;
    let items = [("one", jpeg(50, 40)), ("two", b"corrupt".to_vec()), ("three", jpeg(20, 60))];
    for (id, data) in &items {
        let m = media(id);
        h.storage
            .upload_with_key(&m.url, data.clone(), "image/jpeg")
            .await
            .unwrap();
        h.bus.publish(&Event::CreateThumbnail(m)).await.unwrap();
    }

    let thumbnail = h.consumer("thumbnail");
    let report = drain_until_idle(&h.bus, &[thumbnail], 3, 1).await;
    assert_eq!(report.deliveries, 3);
    assert_eq!(report.completed, 2);
    assert_eq!(report.discarded, 1);

    let created: Vec<String> = h
        .bus
        .published()
        .await
        .iter()
        .filter(|m| m.kind().ok() == Some(EventKind::ThumbnailCreated))
        .filter_map(|m| match Event::from_message(m) {
            Ok(Event::ThumbnailCreated(t)) => Some(t.media_id),
            _ => None,
        })
        .collect();
    assert_eq!(created, vec!["one".to_string(), "three".to_string()]);
    assert!(h.bus.dead_letters("thumbnail").await.is_empty());
}

#[tokio::test]
async fn upload_then_delete_end_to_end() {
    let h = Harness::new().await;

    let uploaded = h
        .pipeline
        .ingest
        .ingest(UploadRequest {
            product_id: "P1".to_string(),
            filename: Some("shoe.jpeg".to_string()),
            content_type: "image/jpeg".to_string(),
            data: jpeg(300, 200),
        })
        .await
        .unwrap();
    h.drain().await;

    let thumbnail_key = format!("media/P1/{}-200x200_thumbnail.png", uploaded.id);
    let listed = h.pipeline.listing.list("P1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].url, format!("https://cdn.test/{}", uploaded.url));
    assert_eq!(
        listed[0].thumbnail_url.as_deref(),
        Some(format!("https://cdn.test/{}", thumbnail_key).as_str())
    );

    h.pipeline.removal.remove("P1", &uploaded.id).await.unwrap();
    assert!(h.pipeline.listing.list("P1").await.unwrap().is_empty());
    assert_eq!(h.bus.pending_count("object-reaper").await, 2);

    h.drain().await;
    assert!(h.storage.is_empty().await);

    // Reaping keys that are already gone still succeeds.
    h.bus
        .publish(&Event::RemoveObject(uploaded.url.clone()))
        .await
        .unwrap();
    h.bus
        .publish(&Event::RemoveObject(thumbnail_key))
        .await
        .unwrap();
    let rerun = drain_until_idle(&h.bus, &h.pipeline.consumers(), 10, 5).await;
    assert_eq!(rerun.completed, 2);
    assert_eq!(rerun.retried, 0);
}

async fn ingest_jpeg(h: &Harness) -> Media {
    h.pipeline
        .ingest
        .ingest(UploadRequest {
            product_id: "P1".to_string(),
            filename: Some("shoe.jpg".to_string()),
            content_type: "image/jpeg".to_string(),
            data: jpeg(120, 80),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn delete_before_thumbnail_is_made_leaves_no_blob() {
    let h = Harness::new().await;
    let uploaded = ingest_jpeg(&h).await;

    // Only the record exists when the delete arrives; CreateThumbnail is still queued.
    drain_until_idle(&h.bus, &[h.consumer("record-writer")], 10, 1).await;
    h.pipeline.removal.remove("P1", &uploaded.id).await.unwrap();
    assert_eq!(h.bus.pending_count("object-reaper").await, 2);

    h.drain().await;

    assert!(h.records.is_empty().await);
    assert!(h.storage.is_empty().await);
}

#[tokio::test]
async fn delete_reaped_before_thumbnail_runs_leaves_no_blob() {
    let h = Harness::new().await;
    let uploaded = ingest_jpeg(&h).await;

    drain_until_idle(&h.bus, &[h.consumer("record-writer")], 10, 1).await;
    h.pipeline.removal.remove("P1", &uploaded.id).await.unwrap();
    drain_until_idle(&h.bus, &[h.consumer("object-reaper")], 10, 1).await;

    let report = drain_until_idle(&h.bus, &[h.consumer("thumbnail")], 10, 1).await;
    assert_eq!(report.discarded, 1);
    assert!(h.storage.is_empty().await);
    assert!(h.bus.is_idle().await);
}

#[tokio::test]
async fn spawned_worker_processes_and_shuts_down() {
    let h = Harness::new().await;
    h.bus.publish(&Event::MediaUploaded(media("a"))).await.unwrap();

    let worker = PipelineWorker::start(
        Arc::new(h.bus.clone()),
        h.pipeline.consumers(),
        PipelineWorkerConfig {
            poll_interval_ms: 10,
            batch_size: 10,
            immediate_retry: true,
        },
    );

    let mut written = false;
    for _ in 0..100 {
        if h.records.get_media("P1", "a").await.unwrap().is_some() {
            written = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.shutdown().await;

    assert!(written);
}
