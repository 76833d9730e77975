pub mod orientation;
pub mod thumbnail;

pub use orientation::ImageOrientation;
pub use thumbnail::{ThumbnailGenerator, ThumbnailImage};
