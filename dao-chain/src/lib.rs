//! DAO Chain Layer - Transaction Verification
//!
//! This crate checks that actions users claim to have taken on chain really
//! happened. It fetches receipts from an EVM node, decodes contract event
//! logs against the platform's module ABIs and gates acceptance on the
//! receipt's status, destination and events.
//!
//! # Architecture
//!
//! - **Receipt Fetcher**: [`ReceiptFetcher`] trait, JSON-RPC implementation over HTTP
//! - **ABI Registry**: per-module ABIs, embedded with an optional directory override
//! - **Event Decoder**: selector-keyed table compiled once, typed argument decoding
//! - **Transaction Verifier**: ordered success / destination / event gates
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dao_chain::{AbiModule, AbiRegistry, ChainConfig, JsonRpcReceiptFetcher, TransactionVerifier};
//!
//! async fn example(tx_hash: alloy_primitives::B256) -> dao_core::DaoResult<()> {
//!     let fetcher = Arc::new(JsonRpcReceiptFetcher::new(ChainConfig::default())?);
//!     let registry = Arc::new(AbiRegistry::embedded()?);
//!     let verifier = TransactionVerifier::new(fetcher, registry);
//!
//!     let verified = verifier
//!         .verify_event(&tx_hash, AbiModule::ProposalVoting, "ProposalCreated")
//!         .await?;
//!     println!("proposal {}", verified.event()?.uint("proposalId")?);
//!     Ok(())
//! }
//! ```

pub mod abi;
pub mod config;
pub mod decoder;
pub mod error;
pub mod receipt;
pub mod rpc;
pub mod verifier;

pub use abi::{AbiModule, AbiRegistry};
pub use config::ChainConfig;
pub use decoder::{AbiValue, DecodedEvent, EventDescriptor, EventLogDecoder};
pub use error::{ChainError, ChainResult};
pub use receipt::{RawLog, TransactionReceipt};
pub use rpc::{InMemoryReceiptFetcher, JsonRpcReceiptFetcher, ReceiptFetcher};
pub use verifier::{Expectation, TransactionVerifier, VerifiedTx};

pub use alloy_dyn_abi::DynSolValue;
