pub mod ingest;
pub mod listing;
pub mod object_reaper;
pub mod record_updater;
pub mod record_writer;
pub mod removal;
pub mod thumbnail;

pub use ingest::{IngestUnit, UploadRequest};
pub use listing::ListingUnit;
pub use object_reaper::ObjectReaperUnit;
pub use record_updater::RecordUpdaterUnit;
pub use record_writer::RecordWriterUnit;
pub use removal::RemovalUnit;
pub use thumbnail::ThumbnailUnit;
