//! Vitrine Storage Library
//!
//! This crate provides the blob store abstraction used by the media pipeline together
//! with S3, local filesystem and in-memory implementations.
//!
//! # Storage key format
//!
//! Keys are generated by `vitrine_core::keys`: `{prefix}/{product_id}/{media_id}{ext}`
//! for primary artifacts and `{stem}-{W}x{H}_thumbnail.png` for thumbnails. Keys must not
//! contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use vitrine_core::StorageBackend;
