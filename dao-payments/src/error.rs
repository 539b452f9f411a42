//! Payment Layer Error Types

use dao_core::{DaoError, Precondition};
use dao_db::StoreError;
use thiserror::Error;

/// Payment provider and flow errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Provider unreachable or timed out
    #[error("Payment provider connection failed: {0}")]
    Connection(String),

    /// Provider answered with an error body
    #[error("Payment provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Provider answered 2xx with an unexpected body
    #[error("Unexpected payment provider response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request failed local validation before reaching the provider
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Precondition(#[from] Precondition),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            PaymentError::Connection(err.to_string())
        } else if err.is_decode() {
            PaymentError::InvalidResponse(err.to_string())
        } else {
            PaymentError::Connection(err.to_string())
        }
    }
}

impl From<PaymentError> for DaoError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidRequest(msg) => DaoError::Validation(msg),
            PaymentError::Precondition(p) => DaoError::StatePrecondition(p),
            PaymentError::NotFound(msg) => DaoError::NotFound(msg),
            PaymentError::Store(e) => e.into(),
            other => DaoError::ProviderError(other.to_string()),
        }
    }
}
