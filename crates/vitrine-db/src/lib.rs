//! Vitrine record store
//!
//! Media metadata lives in a single keyed table: partition `product_id`, sort `media_id`.
//! Consumers only use single-key operations that are safe under duplicate and reordered
//! delivery: an upsert that never touches `thumbnail_url`, a conditional patch of
//! `thumbnail_url`, a delete that tolerates absence, a projection read, and a
//! single-partition query.

pub mod error;
pub mod factory;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{RecordStoreError, RecordStoreResult};
pub use factory::create_record_store;
pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use traits::RecordStore;
