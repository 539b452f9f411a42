//! Request middleware

pub mod auth;

pub use auth::{authenticate, Caller, IdentityProvider, JwtConfig, JwtIdentityProvider};
