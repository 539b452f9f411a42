//! DAO Database error types

use dao_core::DaoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for DaoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => DaoError::NotFound(path),
            StoreError::InvalidPath(msg) | StoreError::InvalidQuery(msg) => DaoError::Validation(msg),
            other => DaoError::Storage(other.to_string()),
        }
    }
}
