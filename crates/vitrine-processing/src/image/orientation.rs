use image::DynamicImage;
use std::io::Cursor;

/// EXIF orientation handling (tag 0x0112, values 1 to 8).
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the orientation of the primary image, defaulting to 1 (normal) when the
    /// container has no EXIF block or the tag is missing or out of range.
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
            .map(|value| value as u8)
            .unwrap_or(1)
    }

    /// Transform that brings an image stored with `orientation` upright.
    pub fn apply_orientation(img: DynamicImage, orientation: u8) -> DynamicImage {
        match orientation {
            2 => img.fliph(),
            3 => img.rotate180(),
            4 => img.flipv(),
            // transpose
            5 => img.rotate90().fliph(),
            6 => img.rotate90(),
            // transverse
            7 => img.rotate270().fliph(),
            8 => img.rotate270(),
            _ => img,
        }
    }

    pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
        let orientation = Self::read_exif_orientation(data);
        if orientation != 1 {
            tracing::debug!(orientation, "Applying EXIF orientation");
        }
        Self::apply_orientation(img, orientation)
    }
}
