//! Bearer Token Authentication
//!
//! [`authenticate`] runs on every request. When an `Authorization` header is
//! present it verifies the token through the configured [`IdentityProvider`],
//! looks up the wallet linked to the user and records the outcome in the
//! request extensions. Handlers that act for a user take the [`Caller`]
//! extractor, which turns a missing or rejected token into `NotAuthenticated`.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dao_core::{CallerIdentity, DaoError, DaoResult};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::debug;

use crate::error::{ApiError, ConfigError};
use crate::state::AppState;

/// Verifies opaque bearer tokens issued by the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// User id the token was issued to
    async fn verify(&self, token: &str) -> DaoResult<String>;
}

/// HS256 JWT settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub validate_exp: bool,
}

impl JwtConfig {
    /// Minimum secret length
    pub const MIN_SECRET_LENGTH: usize = 32;

    pub fn try_new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < Self::MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "auth secret must be at least {} bytes, got {}",
                Self::MIN_SECRET_LENGTH,
                secret.len()
            )));
        }
        Ok(Self {
            secret,
            issuer: None,
            audience: None,
            validate_exp: true,
        })
    }

    /// Load from the environment
    ///
    /// Environment variables:
    /// - DAO_AUTH_SECRET: HS256 secret (required)
    /// - DAO_AUTH_ISSUER: expected `iss`
    /// - DAO_AUTH_AUDIENCE: expected `aud`
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var("DAO_AUTH_SECRET")
            .map_err(|_| ConfigError::Missing("DAO_AUTH_SECRET".to_string()))?;
        let mut config = Self::try_new(secret)?;
        config.issuer = env::var("DAO_AUTH_ISSUER").ok().filter(|s| !s.is_empty());
        config.audience = env::var("DAO_AUTH_AUDIENCE").ok().filter(|s| !s.is_empty());
        Ok(config)
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Claims read from the token; `sub` is the user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

pub struct JwtIdentityProvider {
    config: JwtConfig,
    key: DecodingKey,
}

impl JwtIdentityProvider {
    pub fn new(config: JwtConfig) -> Self {
        let key = DecodingKey::from_secret(config.secret.as_bytes());
        Self { config, key }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = self.config.validate_exp;
        if let Some(ref iss) = self.config.issuer {
            validation.set_issuer(&[iss]);
        }
        match self.config.audience {
            Some(ref aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> DaoResult<String> {
        let data = decode::<AuthClaims>(token, &self.key, &self.validation()).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token has expired".to_string(),
                _ => format!("token rejected: {}", e),
            };
            DaoError::NotAuthenticated(reason)
        })?;
        if data.claims.sub.is_empty() {
            return Err(DaoError::NotAuthenticated("token has no subject".to_string()));
        }
        Ok(data.claims.sub)
    }
}

/// Token part of a `Bearer` authorization header
pub fn extract_token(auth_header: &str) -> DaoResult<&str> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(DaoError::NotAuthenticated(
            "expected `Authorization: Bearer <token>`".to_string(),
        )),
    }
}

/// Outcome of authenticating a request, kept in its extensions
#[derive(Debug, Clone)]
pub enum Authentication {
    Verified(CallerIdentity),
    Rejected(String),
}

async fn resolve(state: &AppState, header: &str) -> DaoResult<CallerIdentity> {
    let token = extract_token(header)?;
    let uid = state.identity.verify(token).await?;
    let wallet = state.services.users.wallet_of(&uid).await?;
    Ok(CallerIdentity::new(uid, wallet))
}

/// Identity middleware
///
/// Never rejects by itself; lookup failures other than authentication
/// errors abort the request.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let header = request.headers().get(AUTHORIZATION).map(|h| h.to_str());

    let outcome = match header {
        None => None,
        Some(Err(_)) => Some(Authentication::Rejected("authorization header is not valid text".to_string())),
        Some(Ok(header)) => match resolve(&state, header).await {
            Ok(caller) => {
                debug!(uid = %caller.uid, wallet = caller.wallet.is_some(), "Request authenticated");
                Some(Authentication::Verified(caller))
            }
            Err(DaoError::NotAuthenticated(reason)) => Some(Authentication::Rejected(reason)),
            Err(other) => return ApiError::from(other).into_response(),
        },
    };

    if let Some(outcome) = outcome {
        request.extensions_mut().insert(outcome);
    }
    next.run(request).await
}

/// The authenticated caller; rejects the request otherwise
#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication>() {
            Some(Authentication::Verified(caller)) => Ok(Caller(caller.clone())),
            Some(Authentication::Rejected(reason)) => Err(DaoError::NotAuthenticated(reason.clone()).into()),
            None => Err(DaoError::NotAuthenticated("authorization header is required".to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token(claims: &AuthClaims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims(sub: &str, expires_in: i64) -> AuthClaims {
        let now = chrono::Utc::now().timestamp();
        AuthClaims {
            sub: sub.to_string(),
            exp: (now + expires_in) as u64,
            iat: now as u64,
            iss: None,
            aud: None,
        }
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc123").unwrap(), "abc123");
        assert!(extract_token("Basic abc123").is_err());
        assert!(extract_token("Bearer ").is_err());
        assert!(extract_token("abc123").is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtConfig::try_new("too-short").is_err());
        assert!(JwtConfig::try_new(SECRET).is_ok());
    }

    #[tokio::test]
    async fn test_verify_returns_subject() {
        let provider = JwtIdentityProvider::new(JwtConfig::try_new(SECRET).unwrap());
        let uid = provider.verify(&token(&claims("uid-1", 3600), SECRET)).await.unwrap();
        assert_eq!(uid, "uid-1");
    }

    #[tokio::test]
    async fn test_expired_and_foreign_tokens_rejected() {
        let provider = JwtIdentityProvider::new(JwtConfig::try_new(SECRET).unwrap());

        let expired = provider.verify(&token(&claims("uid-1", -3600), SECRET)).await;
        assert!(matches!(expired, Err(DaoError::NotAuthenticated(ref m)) if m.contains("expired")));

        let forged = provider
            .verify(&token(&claims("uid-1", 3600), "ffffffffffffffffffffffffffffffff"))
            .await;
        assert!(matches!(forged, Err(DaoError::NotAuthenticated(_))));
    }

    #[tokio::test]
    async fn test_issuer_enforced() {
        let config = JwtConfig::try_new(SECRET).unwrap().with_issuer("https://id.example");
        let provider = JwtIdentityProvider::new(config);

        let mut signed = claims("uid-1", 3600);
        signed.iss = Some("https://other.example".to_string());
        assert!(provider.verify(&token(&signed, SECRET)).await.is_err());

        signed.iss = Some("https://id.example".to_string());
        assert!(provider.verify(&token(&signed, SECRET)).await.is_ok());
    }
}
