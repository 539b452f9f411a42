//! Logging Standards and Conventions
//!
//! All crates log through `tracing`. Verification steps log at DEBUG,
//! committed document mutations at INFO, rejected verifications at WARN.
//!
//! # Structured Logging Fields
//!
//! - `tx_hash`: Transaction hash under verification
//! - `dao`: Canonical DAO address
//! - `entity_id`: Chain-assigned entity identifier
//! - `event`: ABI event name
//! - `actor`: Canonical wallet address acting in the event
//! - `uid`: Off-chain user identifier
//!
//! # Examples
//!
//! ```ignore
//! use tracing::{info, warn};
//!
//! info!(
//!     dao = %dao,
//!     entity_id = %proposal_id,
//!     tx_hash = %tx_hash,
//!     "Proposal created"
//! );
//!
//! warn!(tx_hash = %tx_hash, error = %e, "Vote rejected");
//! ```

use serde::{Deserialize, Serialize};

/// Crates whose targets the default filter covers
pub const WORKSPACE_TARGETS: &[&str] = &[
    "dao_cli",
    "dao_api",
    "dao_db",
    "dao_chain",
    "dao_payments",
];

/// Log level enumeration matching tracing levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// `EnvFilter` directive applying this level to every workspace crate
    pub fn filter_directive(&self) -> String {
        WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("invalid"), None);
    }

    #[test]
    fn test_filter_directive() {
        let directive = LogLevel::Debug.filter_directive();
        assert!(directive.starts_with("dao_cli=debug,"));
        assert!(directive.contains("dao_chain=debug"));
        assert_eq!(directive.matches('=').count(), WORKSPACE_TARGETS.len());
    }
}
