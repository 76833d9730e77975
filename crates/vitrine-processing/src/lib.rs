//! Image processing for the thumbnail unit: decoding, EXIF orientation, resize-to-fill
//! and PNG encoding. Everything here is synchronous and CPU bound; async callers run it
//! on the blocking pool.

pub mod error;
pub mod image;

pub use error::{ProcessingError, ProcessingResult};
pub use crate::image::{ImageOrientation, ThumbnailGenerator, ThumbnailImage};
