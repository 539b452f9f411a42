//! Chain Layer Error Types
//!
//! Error definitions for receipt fetching and ABI handling.

use dao_core::DaoError;
use thiserror::Error;

/// Chain layer error
#[derive(Error, Debug)]
pub enum ChainError {
    /// RPC endpoint unreachable
    #[error("Chain RPC connection failed: {0}")]
    RpcConnection(String),

    /// RPC request failed at the HTTP level
    #[error("Chain RPC request failed: {0}")]
    RpcRequest(String),

    /// RPC node answered with a JSON-RPC error object
    #[error("Chain RPC response error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    /// Node has no receipt for the hash (unknown or not yet mined)
    #[error("Receipt not found for transaction {0}")]
    ReceiptNotFound(String),

    /// Receipt present but not in the expected shape
    #[error("Malformed receipt: {0}")]
    MalformedReceipt(String),

    /// ABI file missing or unparseable
    #[error("ABI error: {0}")]
    Abi(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for chain operations
pub type ChainResult<T> = Result<T, ChainError>;

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ChainError::RpcConnection(err.to_string())
        } else {
            ChainError::RpcRequest(err.to_string())
        }
    }
}

impl From<ChainError> for DaoError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::ReceiptNotFound(tx) => DaoError::TxNotFound(tx),
            other => DaoError::ChainRpc(other.to_string()),
        }
    }
}
