//! Input validation for the ingest path.

use crate::error::AppError;
use crate::models::MediaType;

/// Longest product id accepted by ingest.
pub const MAX_PRODUCT_ID_LENGTH: usize = 128;

/// Declared content types accepted by ingest and the media type each maps to.
pub const SUPPORTED_CONTENT_TYPES: &[(&str, MediaType)] = &[
    ("image/gif", MediaType::Image),
    ("image/jpeg", MediaType::Image),
    ("image/jpg", MediaType::Image),
    ("image/png", MediaType::Image),
    ("video/mp4", MediaType::Video),
];

/// Strip parameters (`; charset=...`) and normalise case.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Map a declared content type to a media type, or `None` if it is not whitelisted.
pub fn media_type_for_content_type(content_type: &str) -> Option<MediaType> {
    let normalized = normalize_content_type(content_type);
    SUPPORTED_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == normalized)
        .map(|(_, media_type)| *media_type)
}

/// Validate a declared content type and return the media type it maps to.
pub fn validate_content_type(content_type: &str) -> Result<MediaType, AppError> {
    media_type_for_content_type(content_type).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Unsupported content type '{}', allowed: {}",
            content_type,
            SUPPORTED_CONTENT_TYPES
                .iter()
                .map(|(ct, _)| *ct)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

/// Product ids become a storage key segment, so they may not contain separators.
pub fn validate_product_id(product_id: &str) -> Result<(), AppError> {
    if product_id.trim().is_empty() {
        return Err(AppError::InvalidInput("Product id is required".to_string()));
    }
    if product_id.len() > MAX_PRODUCT_ID_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Product id exceeds {} characters",
            MAX_PRODUCT_ID_LENGTH
        )));
    }
    if product_id.contains('/') || product_id.contains("..") || product_id.contains('\\') {
        return Err(AppError::InvalidInput(
            "Product id contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate upload size against the configured maximum.
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds max {} bytes",
            file_size, max_size
        )));
    }
    Ok(())
}
