use super::orientation::ImageOrientation;
use crate::error::{ProcessingError, ProcessingResult};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Filter used for every thumbnail resize.
pub const THUMBNAIL_FILTER: FilterType = FilterType::CatmullRom;

/// Encoded thumbnail and its final size.
#[derive(Debug, Clone)]
pub struct ThumbnailImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Produces fixed-size PNG thumbnails.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailGenerator {
    width: u32,
    height: u32,
}

impl ThumbnailGenerator {
    pub fn new(width: u32, height: u32) -> ProcessingResult<Self> {
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decode `data` (format guessed from content), bring it upright, resize to fill
    /// `width x height` and encode as PNG.
    pub fn generate(&self, data: &[u8]) -> ProcessingResult<ThumbnailImage> {
        let img = decode(data)?;
        let img = ImageOrientation::apply_exif_orientation(img, data);
        let thumbnail = resize(&img, self.width, self.height);
        let encoded = encode_png(&thumbnail)?;

        tracing::debug!(
            source_bytes = data.len(),
            thumbnail_bytes = encoded.len(),
            width = thumbnail.width(),
            height = thumbnail.height(),
            "Thumbnail generated"
        );

        Ok(ThumbnailImage {
            data: encoded,
            width: thumbnail.width(),
            height: thumbnail.height(),
        })
    }
}

/// Scale to cover `width x height` keeping the aspect ratio, then centre crop.
pub fn resize(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_to_fill(width, height, THUMBNAIL_FILTER)
}

pub fn decode(data: &[u8]) -> ProcessingResult<DynamicImage> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| ProcessingError::Decode(e.to_string()))
}

pub fn encode_png(img: &DynamicImage) -> ProcessingResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ProcessingError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}
