//! Vitrine API Library
//!
//! HTTP gateway over the synchronous units (ingest, listing, removal) and the wiring of
//! the single-process runner.

mod api_doc;
mod handlers;
mod utils;

pub mod error;
pub mod setup;
pub mod state;

pub use api_doc::{get_openapi_spec, ApiDoc};
pub use error::{ErrorResponse, HttpAppError};
pub use setup::{initialize_app, start_pipeline_worker, Application};
pub use state::AppState;
