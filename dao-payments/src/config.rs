//! Payment Provider Configuration
//!
//! Loaded from environment variables with the GOCARDLESS_ prefix.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{PaymentError, PaymentResult};

pub const DEFAULT_API_VERSION: &str = "2015-07-06";
pub const DEFAULT_SUCCESS_URL: &str = "http://localhost:3001/success";

/// Provider environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoCardlessEnvironment {
    #[default]
    Sandbox,
    Live,
}

impl GoCardlessEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://api-sandbox.gocardless.com",
            Self::Live => "https://api.gocardless.com",
        }
    }

    /// Anything other than `live` selects the sandbox
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("live") {
            Self::Live
        } else {
            Self::Sandbox
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoCardlessConfig {
    /// Bearer token for the provider API
    pub access_token: String,
    pub environment: GoCardlessEnvironment,
    /// Overrides the environment's base URL
    pub base_url: Option<String>,
    /// Where the hosted form sends the payer once done
    pub success_redirect_url: String,
    pub api_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GoCardlessConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            environment: GoCardlessEnvironment::Sandbox,
            base_url: None,
            success_redirect_url: DEFAULT_SUCCESS_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: dao_core::DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl GoCardlessConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - GOCARDLESS_ACCESS_TOKEN: API access token
    /// - GOCARDLESS_ENVIRONMENT: `sandbox` or `live`
    /// - GOCARDLESS_BASE_URL: explicit API base URL
    /// - GOCARDLESS_SUCCESS_URL: redirect target after the hosted form
    /// - GOCARDLESS_API_VERSION: value of the GoCardless-Version header
    /// - GOCARDLESS_TIMEOUT: request timeout in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            access_token: env::var("GOCARDLESS_ACCESS_TOKEN").unwrap_or(defaults.access_token),
            environment: env::var("GOCARDLESS_ENVIRONMENT")
                .map(|s| GoCardlessEnvironment::parse(&s))
                .unwrap_or(defaults.environment),
            base_url: env::var("GOCARDLESS_BASE_URL").ok().filter(|s| !s.is_empty()),
            success_redirect_url: env::var("GOCARDLESS_SUCCESS_URL")
                .unwrap_or(defaults.success_redirect_url),
            api_version: env::var("GOCARDLESS_API_VERSION").unwrap_or(defaults.api_version),
            timeout_secs: env::var("GOCARDLESS_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// Sandbox configuration against an explicit endpoint
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn api_base(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }

    pub fn validate(&self) -> PaymentResult<()> {
        if self.access_token.is_empty() {
            return Err(PaymentError::Configuration(
                "GOCARDLESS_ACCESS_TOKEN is not set".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(PaymentError::Configuration("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_selects_base_url() {
        let live = GoCardlessConfig {
            environment: GoCardlessEnvironment::parse("LIVE"),
            ..GoCardlessConfig::default()
        };
        assert_eq!(live.api_base(), "https://api.gocardless.com");
        assert_eq!(GoCardlessEnvironment::parse("staging"), GoCardlessEnvironment::Sandbox);

        let local = GoCardlessConfig::with_base_url("token", "http://127.0.0.1:9000/");
        assert_eq!(local.api_base(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_missing_token_rejected() {
        let config = GoCardlessConfig::default();
        assert_eq!(config.api_version, "2015-07-06");
        assert!(matches!(config.validate(), Err(PaymentError::Configuration(_))));
    }
}
