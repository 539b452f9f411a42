//! Chain Configuration
//!
//! Configuration for the EVM node connection and contract ABIs.
//! Supports loading from environment variables with the DAO_CHAIN_ prefix.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ChainError, ChainResult};

/// EVM node and contract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Factory contract DAO creation transactions must target
    pub dao_factory: Option<Address>,
    /// Directory with ABI JSON files overriding the embedded ones
    pub abi_dir: Option<PathBuf>,
}

fn default_timeout() -> u64 {
    dao_core::DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: default_timeout(),
            dao_factory: None,
            abi_dir: None,
        }
    }
}

impl ChainConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - DAO_CHAIN_RPC_URL: JSON-RPC endpoint URL
    /// - DAO_CHAIN_RPC_TIMEOUT: Request timeout in seconds
    /// - DAO_CHAIN_DAO_FACTORY: Expected destination of DAO creation transactions
    /// - DAO_CHAIN_ABI_DIR: Directory with ABI JSON overrides
    pub fn from_env() -> ChainResult<Self> {
        let defaults = Self::default();

        let dao_factory = match env::var("DAO_CHAIN_DAO_FACTORY") {
            Ok(raw) if !raw.trim().is_empty() => Some(Address::from_str(raw.trim()).map_err(|_| {
                ChainError::Configuration(format!("DAO_CHAIN_DAO_FACTORY is not an address: {}", raw))
            })?),
            _ => None,
        };

        Ok(Self {
            rpc_url: env::var("DAO_CHAIN_RPC_URL").unwrap_or(defaults.rpc_url),
            timeout_secs: env::var("DAO_CHAIN_RPC_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            dao_factory,
            abi_dir: env::var("DAO_CHAIN_ABI_DIR").ok().map(PathBuf::from),
        })
    }

    /// Configuration pointing at `rpc_url` with defaults elsewhere
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Self::default()
        }
    }

    /// Set the DAO factory address
    pub fn with_dao_factory(mut self, factory: Address) -> Self {
        self.dao_factory = Some(factory);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ChainResult<()> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ChainError::Configuration(format!(
                "RPC URL must be http(s): {}",
                self.rpc_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ChainError::Configuration("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChainConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = ChainConfig::with_rpc_url("ws://localhost:8546");
        assert!(matches!(config.validate(), Err(ChainError::Configuration(_))));
    }
}
