use thiserror::Error;
use vitrine_core::AppError;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),

    #[error("Invalid thumbnail dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::ImageProcessing(err.to_string())
    }
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;
