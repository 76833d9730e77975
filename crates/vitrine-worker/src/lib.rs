//! Pipeline worker: polls every subscription, runs its consumer over each batch and
//! settles deliveries with the bus.

pub mod worker;

pub use worker::{
    compute_retry_backoff_seconds, drain_until_idle, DrainReport, PipelineWorker,
    PipelineWorkerConfig, MAX_RETRY_BACKOFF_SECS,
};
