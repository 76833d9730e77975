//! Test fixtures: encoded images and multipart forms.

use axum_test::multipart::{MultipartForm, Part};
use std::io::Cursor;

/// Encoded JPEG of the given size.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 40, 90]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    buffer.into_inner()
}

/// Minimal PDF header, enough to be recognisable but never decoded.
pub fn create_test_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n".to_vec()
}

/// Form with a single `file` part.
pub fn file_form(data: Vec<u8>, filename: &str, content_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data)
            .file_name(filename.to_string())
            .mime_type(content_type.to_string()),
    )
}
