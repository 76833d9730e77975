use vitrine_api::setup::{self, server};
use vitrine_core::Config;

// mimalloc behaves better than the musl allocator inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let app = setup::initialize_app(config.clone()).await?;
    let worker = setup::start_pipeline_worker(&config, &app);

    let served = server::start_server(&config, app.router).await;

    if let Some(worker) = worker {
        worker.shutdown().await;
    }
    vitrine_infra::shutdown_telemetry().await;

    served
}
