//! Application state for the API server

use alloy_primitives::Address;
use dao_chain::TransactionVerifier;
use dao_db::{DocumentStore, Reconciler, Services};
use dao_payments::{PaymentFlowOrchestrator, PaymentProvider, WebhookProcessor};
use std::env;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::middleware::{IdentityProvider, JwtConfig};

/// Collaborators the API is assembled from
pub struct AppComponents {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: TransactionVerifier,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Contract DAO creation transactions must target
    pub dao_factory: Option<Address>,
    pub success_redirect_url: String,
}

/// API server state
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub payments: Arc<PaymentFlowOrchestrator>,
    pub webhooks: Arc<WebhookProcessor>,
    pub identity: Arc<dyn IdentityProvider>,
    pub version: String,
}

impl AppState {
    pub fn new(components: AppComponents) -> Self {
        let AppComponents {
            store,
            verifier,
            payment_provider,
            identity,
            dao_factory,
            success_redirect_url,
        } = components;

        let reconciler = Reconciler::new(store.clone(), verifier);
        Self {
            services: Arc::new(Services::new(reconciler, dao_factory)),
            payments: Arc::new(PaymentFlowOrchestrator::new(
                store.clone(),
                payment_provider.clone(),
                success_redirect_url,
            )),
            webhooks: Arc::new(WebhookProcessor::new(store, payment_provider)),
            identity,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub auth: JwtConfig,
}

impl ApiConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;

    pub fn new(auth: JwtConfig) -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            enable_cors: true,
            auth,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - DAO_API_HOST: bind address
    /// - DAO_API_PORT: bind port
    /// - DAO_API_CORS: `false` disables the permissive CORS layer
    /// - DAO_AUTH_SECRET, DAO_AUTH_ISSUER, DAO_AUTH_AUDIENCE: token validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("DAO_API_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("DAO_API_PORT is not a port: {}", raw)))?,
            Err(_) => Self::DEFAULT_PORT,
        };

        Ok(Self {
            host: env::var("DAO_API_HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string()),
            port,
            enable_cors: env::var("DAO_API_CORS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            auth: JwtConfig::from_env()?,
        })
    }
}
