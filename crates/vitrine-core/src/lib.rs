//! Vitrine Core Library
//!
//! This crate provides the domain models, pipeline events, error types, configuration,
//! and validation shared by every Vitrine processing unit.

pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, PipelineConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use events::{Event, EventError, EventKind, EventMessage, EVENT_ATTRIBUTE};
pub use models::{ArtifactKeys, Media, MediaRecord, MediaSummary, MediaType, Thumbnail};
pub use storage_types::{BusBackend, LogFormat, StorageBackend};
