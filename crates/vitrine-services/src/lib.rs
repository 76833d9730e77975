//! Vitrine processing units
//!
//! Synchronous units (ingest, removal, listing) are called by the HTTP layer and return
//! `Result<_, AppError>`. Asynchronous units implement [`EventConsumer`]: they never
//! return errors, they classify every delivery as completed, retryable or discardable.
//! All units receive their storage, record store and bus as injected capabilities.

pub mod consumer;
pub mod pipeline;
pub mod units;

#[cfg(test)]
pub(crate) mod test_support;

pub use consumer::{
    process_batch, process_message, BatchReport, DeliveryOutcome, DeliveryResult, EventConsumer,
};
pub use pipeline::{pipeline_subscriptions, Pipeline, PipelineSettings};
pub use units::{
    IngestUnit, ListingUnit, ObjectReaperUnit, RecordUpdaterUnit, RecordWriterUnit, RemovalUnit,
    ThumbnailUnit, UploadRequest,
};
