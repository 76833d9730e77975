//! Wiring of every unit over shared capabilities.

use crate::consumer::EventConsumer;
use crate::units::{
    IngestUnit, ListingUnit, ObjectReaperUnit, RecordUpdaterUnit, RecordWriterUnit, RemovalUnit,
    ThumbnailUnit,
};
use std::sync::Arc;
use vitrine_bus::{EventBus, SubscriptionSpec};
use vitrine_core::{AppError, Config};
use vitrine_db::RecordStore;
use vitrine_processing::ThumbnailGenerator;
use vitrine_storage::Storage;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub media_prefix: String,
    pub static_url: String,
    pub max_file_size_bytes: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            media_prefix: config.media_prefix().to_string(),
            static_url: config.static_url().to_string(),
            max_file_size_bytes: config.max_file_size_bytes(),
            thumbnail_width: config.thumbnail_width(),
            thumbnail_height: config.thumbnail_height(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            media_prefix: "media".to_string(),
            static_url: String::new(),
            max_file_size_bytes: 10 * 1024 * 1024,
            thumbnail_width: 200,
            thumbnail_height: 200,
        }
    }
}

/// One subscription per asynchronous unit.
pub fn pipeline_subscriptions() -> Vec<SubscriptionSpec> {
    vec![
        SubscriptionSpec::new(ThumbnailUnit::NAME, ThumbnailUnit::SUBSCRIBES_TO.iter().copied()),
        SubscriptionSpec::new(
            RecordWriterUnit::NAME,
            RecordWriterUnit::SUBSCRIBES_TO.iter().copied(),
        ),
        SubscriptionSpec::new(
            RecordUpdaterUnit::NAME,
            RecordUpdaterUnit::SUBSCRIBES_TO.iter().copied(),
        ),
        SubscriptionSpec::new(
            ObjectReaperUnit::NAME,
            ObjectReaperUnit::SUBSCRIBES_TO.iter().copied(),
        ),
    ]
}

#[derive(Clone)]
pub struct Pipeline {
    pub ingest: IngestUnit,
    pub removal: RemovalUnit,
    pub listing: ListingUnit,
    consumers: Vec<Arc<dyn EventConsumer>>,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        records: Arc<dyn RecordStore>,
        bus: Arc<dyn EventBus>,
        settings: PipelineSettings,
    ) -> Result<Self, AppError> {
        let generator = ThumbnailGenerator::new(settings.thumbnail_width, settings.thumbnail_height)?;

        let consumers: Vec<Arc<dyn EventConsumer>> = vec![
            Arc::new(ThumbnailUnit::new(storage.clone(), bus.clone(), generator)),
            Arc::new(RecordWriterUnit::new(records.clone())),
            Arc::new(RecordUpdaterUnit::new(records.clone())),
            Arc::new(ObjectReaperUnit::new(storage.clone())),
        ];

        Ok(Self {
            ingest: IngestUnit::new(
                storage,
                bus.clone(),
                settings.media_prefix,
                settings.max_file_size_bytes,
            ),
            removal: RemovalUnit::new(
                records.clone(),
                bus,
                (settings.thumbnail_width, settings.thumbnail_height),
            ),
            listing: ListingUnit::new(records, settings.static_url),
            consumers,
        })
    }

    /// Asynchronous units, one per entry of [`pipeline_subscriptions`].
    pub fn consumers(&self) -> Vec<Arc<dyn EventConsumer>> {
        self.consumers.clone()
    }
}
