//! Error types module
//!
//! All failures a synchronous unit can report are unified under [`AppError`]. Each
//! collaborator crate (storage, record store, bus) converts its own error type into
//! `AppError` at the unit boundary. The [`ErrorMetadata`] trait lets the HTTP layer render
//! any variant without matching on it.

use std::io;

/// Level at which the HTTP layer logs an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad content type, unknown media
    Debug,
    Warn,
    /// Infrastructure failures
    Error,
}

/// How an error is presented to clients and operators.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable upper-case code, e.g. `EVENT_BUS_ERROR`.
    fn error_code(&self) -> &'static str;

    /// True when the same request may succeed later.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to return to clients.
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their details, whatever the environment.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Record store error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Event bus error: {0}")]
    Bus(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal failure: {0}")]
    Internal(String),

    #[error("Internal failure: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("I/O failure: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("Malformed JSON: {}", err))
    }
}

struct VariantMetadata {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    log_level: LogLevel,
}

const RETRY_LATER: Option<&str> = Some("Retry after a short delay");

impl AppError {
    fn metadata(&self) -> VariantMetadata {
        let infrastructure = |code| VariantMetadata {
            status: 500,
            code,
            recoverable: true,
            action: RETRY_LATER,
            sensitive: true,
            log_level: LogLevel::Error,
        };
        let client = |status, code, action| VariantMetadata {
            status,
            code,
            recoverable: false,
            action: Some(action),
            sensitive: false,
            log_level: LogLevel::Debug,
        };

        match self {
            AppError::Database(_) => infrastructure("DATABASE_ERROR"),
            AppError::Storage(_) => infrastructure("STORAGE_ERROR"),
            AppError::Bus(_) => infrastructure("EVENT_BUS_ERROR"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => VariantMetadata {
                action: Some("Contact support if this keeps happening"),
                ..infrastructure("INTERNAL_ERROR")
            },
            AppError::ImageProcessing(_) => VariantMetadata {
                log_level: LogLevel::Warn,
                ..client(
                    400,
                    "IMAGE_PROCESSING_ERROR",
                    "Upload a JPEG, PNG or GIF image that opens locally",
                )
            },
            AppError::InvalidInput(_) => client(
                400,
                "INVALID_INPUT",
                "Check the product id, the `file` field and its content type",
            ),
            AppError::NotFound(_) => client(
                404,
                "NOT_FOUND",
                "Verify the product and media identifiers",
            ),
            AppError::PayloadTooLarge(_) => client(
                413,
                "PAYLOAD_TOO_LARGE",
                "Upload a smaller file",
            ),
        }
    }

    /// Variant name, shown as `error_type` outside production.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Bus(_) => "Bus",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display message followed by up to five levels of `source()`.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        const MAX_DEPTH: usize = 5;

        let causes: Vec<String> = std::iter::successors(self.source(), |&err| err.source())
            .take(MAX_DEPTH + 1)
            .map(|err| err.to_string())
            .collect();

        let mut details = self.to_string();
        for (depth, cause) in causes.iter().enumerate() {
            if depth == MAX_DEPTH {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str("\n  Caused by: ");
            details.push_str(cause);
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.metadata().status
    }

    fn error_code(&self) -> &'static str {
        self.metadata().code
    }

    fn is_recoverable(&self) -> bool {
        self.metadata().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.metadata().action
    }

    fn is_sensitive(&self) -> bool {
        self.metadata().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.metadata().log_level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access record store".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Bus(_) => "Failed to publish pipeline event".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::ImageProcessing(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg) => msg.clone(),
        }
    }
}
