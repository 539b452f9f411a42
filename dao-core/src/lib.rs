//! DAO Core - shared foundation for the DAO platform backend
//!
//! The backend mirrors on-chain DAO activity into a document store. Nothing
//! is written until the claimed transaction has been fetched, decoded and
//! cross-checked. This crate holds the pieces every layer shares:
//! - Canonical address handling and request-field parsing
//! - Entity status enums and their on-chain index mappings
//! - The error taxonomy surfaced to callers
//! - Field consistency rules applied between verification and persistence

pub mod consistency;
pub mod constants;
pub mod error;
pub mod logging;
pub mod types;

pub use constants::*;
pub use error::*;
pub use types::*;

// Re-export the primitive types used in public signatures
pub use alloy_primitives::{Address, B256, U256};
