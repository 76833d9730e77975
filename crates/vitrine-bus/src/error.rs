use thiserror::Error;
use vitrine_core::{AppError, EventError};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Failed to publish message: {0}")]
    Publish(String),

    #[error("Failed to receive messages: {0}")]
    Receive(String),

    #[error("Failed to settle delivery: {0}")]
    Settle(String),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),

    #[error("Unknown or expired receipt: {0}")]
    UnknownReceipt(String),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] EventError),

    #[error("Bus configuration error: {0}")]
    Config(String),
}

impl From<BusError> for AppError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Config(msg) => AppError::Internal(msg),
            BusError::UnknownSubscription(name) => {
                AppError::Internal(format!("Unknown subscription: {}", name))
            }
            other => AppError::Bus(other.to_string()),
        }
    }
}

pub type BusResult<T> = Result<T, BusError>;
