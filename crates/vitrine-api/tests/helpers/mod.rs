//! Test helpers: build the router over in-memory adapters.
//!
//! Run from workspace root: `cargo test -p vitrine-api`. No external services needed.

pub mod fixtures;

use axum_test::TestServer;
use std::collections::BTreeMap;
use std::sync::Arc;
use vitrine_api::setup::routes;
use vitrine_api::AppState;
use vitrine_bus::MemoryBus;
use vitrine_core::{
    BaseConfig, BusBackend, Config, LogFormat, PipelineConfig, StorageBackend,
};
use vitrine_db::MemoryRecordStore;
use vitrine_services::{pipeline_subscriptions, Pipeline, PipelineSettings};
use vitrine_storage::MemoryStorage;
use vitrine_worker::{drain_until_idle, DrainReport};

pub const STATIC_URL: &str = "https://cdn.test/";
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024;

/// Test application: server plus handles on the in-memory backends.
pub struct TestApp {
    pub server: TestServer,
    pub storage: MemoryStorage,
    pub records: MemoryRecordStore,
    pub bus: MemoryBus,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Run every pipeline consumer until the bus has nothing left to deliver.
    pub async fn drain(&self) -> DrainReport {
        drain_until_idle(&self.bus, &self.state.pipeline.consumers(), 10, 20).await
    }
}

pub fn test_config() -> Config {
    Config(Box::new(PipelineConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            log_format: LogFormat::Compact,
            db_max_connections: 1,
            db_timeout_seconds: 5,
        },
        database_url: None,
        storage_backend: StorageBackend::Memory,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: None,
        media_prefix: "media".to_string(),
        static_url: STATIC_URL.to_string(),
        max_file_size_bytes: MAX_UPLOAD_BYTES,
        thumbnail_width: 200,
        thumbnail_height: 200,
        bus_backend: BusBackend::Memory,
        sns_topic_arn: None,
        queue_urls: BTreeMap::new(),
        bus_max_deliveries: 5,
        worker_enabled: false,
        worker_poll_interval_ms: 50,
        worker_batch_size: 10,
    }))
}

pub async fn setup_test_app() -> TestApp {
    let config = test_config();
    let storage = MemoryStorage::new();
    let records = MemoryRecordStore::new();
    let bus = MemoryBus::new(config.bus_max_deliveries())
        .recording()
        .with_subscriptions(pipeline_subscriptions())
        .await;

    let pipeline = Pipeline::new(
        Arc::new(storage.clone()),
        Arc::new(records.clone()),
        Arc::new(bus.clone()),
        PipelineSettings::from_config(&config),
    )
    .expect("Failed to build pipeline");

    let state = Arc::new(AppState {
        config: config.clone(),
        pipeline,
        records: Arc::new(records.clone()),
        storage: Arc::new(storage.clone()),
    });

    let app = routes::setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        records,
        bus,
        state,
    }
}
