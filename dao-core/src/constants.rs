//! Platform Constants
//!
//! Default values and limits shared across crates.

// ============================================================================
// Pagination
// ============================================================================

/// Default page size for list endpoints
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Upper bound on any requested page size
pub const MAX_LIST_LIMIT: usize = 100;

/// Default page size for a user's DAO listing
pub const DEFAULT_USER_DAOS_LIMIT: usize = 10;

// ============================================================================
// Wallet linking
// ============================================================================

/// Prefix of the personal-sign message proving wallet ownership
pub const WALLET_LINK_MESSAGE_PREFIX: &str = "Link this wallet to my Anise account at ";

/// Message a user signs to link a wallet to `uid`
pub fn wallet_link_message(uid: &str) -> String {
    format!("{}{}", WALLET_LINK_MESSAGE_PREFIX, uid)
}

// ============================================================================
// Timeouts
// ============================================================================

/// Default timeout for outbound HTTP calls (chain RPC, payment provider)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Clamp a requested page size into `1..=MAX_LIST_LIMIT`
pub fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_LIST_LIMIT)
}
