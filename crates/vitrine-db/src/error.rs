use thiserror::Error;
use vitrine_core::AppError;

/// Record store errors
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// The conditional patch found no record for the key.
    #[error("Media record not found: product_id={product_id}, media_id={media_id}")]
    NotFound {
        product_id: String,
        media_id: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt media record: {0}")]
    Corrupt(String),
}

impl RecordStoreError {
    pub fn not_found(product_id: &str, media_id: &str) -> Self {
        RecordStoreError::NotFound {
            product_id: product_id.to_string(),
            media_id: media_id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordStoreError::NotFound { .. })
    }
}

impl From<RecordStoreError> for AppError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            RecordStoreError::Database(e) => AppError::Database(e.to_string()),
            RecordStoreError::Corrupt(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type for record store operations
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;
