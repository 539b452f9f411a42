//! Error types for DAO Core
//!
//! One taxonomy is shared by every crate in the workspace. Lower layers
//! (chain client, document store, payment provider) convert their own error
//! enums into [`DaoError`] so request handlers can use `?` end to end.

use thiserror::Error;

/// Platform errors surfaced to callers
#[derive(Error, Debug)]
pub enum DaoError {
    /// Receipt absent: the transaction is unknown or not yet mined
    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    /// Receipt present but execution failed
    #[error("Transaction reverted: {0}")]
    TxReverted(String),

    /// Receipt targets a different contract than expected
    #[error("Transaction sent to {actual}, expected {expected}")]
    TxWrongDestination { expected: String, actual: String },

    /// No log in the receipt decodes to the expected event
    #[error("Event {event} not found in transaction {tx_hash}")]
    EventNotFound { event: String, tx_hash: String },

    /// Decoded on-chain value disagrees with the submitted payload
    #[error("Field mismatch on {field}: {detail}")]
    FieldMismatch { field: String, detail: String },

    /// Persisted state does not allow the requested transition
    #[error("Precondition failed: {0}")]
    StatePrecondition(#[from] Precondition),

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Payment provider call failed or was rejected
    #[error("Payment provider error: {0}")]
    ProviderError(String),

    /// Request is malformed or missing required fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Chain RPC endpoint unreachable or returned a malformed answer
    #[error("Chain RPC error: {0}")]
    ChainRpc(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DaoError {
    /// Build a field mismatch carrying both sides of the comparison
    pub fn field_mismatch(
        field: impl Into<String>,
        on_chain: impl std::fmt::Display,
        submitted: impl std::fmt::Display,
    ) -> Self {
        Self::FieldMismatch {
            field: field.into(),
            detail: format!("on-chain value `{}` does not match `{}`", on_chain, submitted),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::TxNotFound(_) => "TX_NOT_FOUND",
            Self::TxReverted(_) => "TX_REVERTED",
            Self::TxWrongDestination { .. } => "TX_WRONG_DESTINATION",
            Self::EventNotFound { .. } => "EVENT_NOT_FOUND",
            Self::FieldMismatch { .. } => "FIELD_MISMATCH",
            Self::StatePrecondition(_) => "STATE_PRECONDITION",
            Self::NotAuthenticated(_) => "NOT_AUTHENTICATED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ProviderError(_) => "PROVIDER_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ChainRpc(_) => "CHAIN_RPC_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the same request may succeed later without changes
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TxNotFound(_) | Self::ChainRpc(_))
    }
}

/// State-precondition violations, one per rejected condition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    #[error("{entity} is {actual}, expected {expected}")]
    UnexpectedStatus {
        entity: String,
        expected: String,
        actual: String,
    },

    #[error("{voter} has already voted on {entity}")]
    AlreadyVoted { entity: String, voter: String },

    #[error("{actor} cannot vote on their own {entity}")]
    SelfVote { entity: String, actor: String },

    #[error("{member} is already a member of {dao}")]
    AlreadyMember { dao: String, member: String },

    #[error("{member} already has a join request pending in {dao}")]
    JoinRequestPending { dao: String, member: String },

    #[error("{signer} has already signed document {document}")]
    AlreadySigned { document: String, signer: String },

    #[error("transaction {0} has already been recorded")]
    TransactionReplayed(String),

    #[error("document {0} is already executed")]
    AlreadyExecuted(String),

    #[error("wallet {0} is already linked to another user")]
    WalletLinkedElsewhere(String),

    #[error("a different wallet is already linked to this account")]
    WalletAlreadyLinked,

    #[error("no payment flow has been started")]
    NoPaymentFlow,

    #[error("redirect flow {0} is not the flow in progress")]
    FlowMismatch(String),
}

/// Result type alias for platform operations
pub type DaoResult<T> = Result<T, DaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DaoError::TxNotFound("0x1".into()).code(), "TX_NOT_FOUND");
        assert_eq!(
            DaoError::from(Precondition::WalletAlreadyLinked).code(),
            "STATE_PRECONDITION"
        );
        assert_eq!(DaoError::validation("x").code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_retryable() {
        assert!(DaoError::TxNotFound("0x1".into()).is_retryable());
        assert!(!DaoError::TxReverted("0x1".into()).is_retryable());
    }

    #[test]
    fn test_field_mismatch_message() {
        let err = DaoError::field_mismatch("title", "Budget", "Budget!!");
        assert_eq!(
            err.to_string(),
            "Field mismatch on title: on-chain value `Budget` does not match `Budget!!`"
        );
    }
}
