//! Application setup and initialization
//!
//! Wiring lives here rather than in `main.rs` so tests can build the same router.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use vitrine_bus::BusHandles;
use vitrine_core::Config;
use vitrine_services::{pipeline_subscriptions, Pipeline, PipelineSettings};
use vitrine_worker::{PipelineWorker, PipelineWorkerConfig};

/// A fully wired application: router for the gateway, bus handles for the worker.
pub struct Application {
    pub state: Arc<AppState>,
    pub router: Router,
    pub bus: BusHandles,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<Application> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    vitrine_infra::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let storage = vitrine_storage::create_storage(&config)
        .await
        .context("Failed to initialize blob storage")?;
    let records = vitrine_db::create_record_store(&config)
        .await
        .context("Failed to initialize record store")?;
    let bus = vitrine_bus::create_event_bus(&config, pipeline_subscriptions())
        .await
        .context("Failed to initialize event bus")?;

    let pipeline = Pipeline::new(
        storage.clone(),
        records.clone(),
        bus.publisher.clone(),
        PipelineSettings::from_config(&config),
    )?;

    let state = Arc::new(AppState {
        config: config.clone(),
        pipeline,
        records,
        storage,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok(Application { state, router, bus })
}

/// Start the subscription polling loops unless `WORKER_ENABLED=false`.
pub fn start_pipeline_worker(config: &Config, app: &Application) -> Option<PipelineWorker> {
    if !config.worker_enabled() {
        tracing::info!("Pipeline worker disabled, events are left for an external worker");
        return None;
    }

    Some(PipelineWorker::start(
        app.bus.source.clone(),
        app.state.pipeline.consumers(),
        PipelineWorkerConfig::from_config(config),
    ))
}
