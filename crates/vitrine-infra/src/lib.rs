//! Vitrine Infrastructure Library
//!
//! Shared infrastructure for the Vitrine binaries:
//! - Middleware (request ID)
//! - Telemetry initialization (compact or JSON logs)

pub mod middleware;
pub mod telemetry;

pub use middleware::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use telemetry::{init_telemetry, shutdown_telemetry, DEFAULT_LOG_FILTER};
