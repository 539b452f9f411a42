//! API Error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dao_core::DaoError;
use dao_payments::PaymentError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Dao(#[from] DaoError),

    /// Body could not be read as the expected JSON shape
    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Dao(err.into())
    }
}

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration: {0} is not set")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// HTTP status for each platform error
pub fn status_for(err: &DaoError) -> StatusCode {
    match err {
        DaoError::Validation(_) => StatusCode::BAD_REQUEST,
        DaoError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
        DaoError::NotFound(_) | DaoError::TxNotFound(_) => StatusCode::NOT_FOUND,
        DaoError::StatePrecondition(_) => StatusCode::CONFLICT,
        DaoError::TxReverted(_)
        | DaoError::TxWrongDestination { .. }
        | DaoError::EventNotFound { .. }
        | DaoError::FieldMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DaoError::ProviderError(_) | DaoError::ChainRpc(_) => StatusCode::BAD_GATEWAY,
        DaoError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Dao(e) => (status_for(e), e.code(), e.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string()),
        };

        if status.is_server_error() {
            error!(code, "Request failed: {}", message);
        } else if status == StatusCode::UNPROCESSABLE_ENTITY {
            warn!(code, "Verification rejected: {}", message);
        }

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
