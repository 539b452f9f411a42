//! DAO Database Layer
//!
//! Document store abstraction and the verified reconciliation services that
//! mirror on-chain DAO activity into it.
//!
//! # Layout
//!
//! - [`store`] - `DocumentStore` trait, write batches, queries, in-memory backend
//! - [`paths`] - where each entity lives in the document tree
//! - [`reconcile`] - verify-then-write pipeline shared by every entity kind
//! - [`services`] - one service per entity family
//!
//! # Usage
//!
//! ```ignore
//! use dao_chain::{AbiRegistry, JsonRpcReceiptFetcher, TransactionVerifier};
//! use dao_db::{MemoryDocumentStore, Reconciler, Services};
//! use std::sync::Arc;
//!
//! let fetcher = Arc::new(JsonRpcReceiptFetcher::new(chain_config)?);
//! let verifier = TransactionVerifier::new(fetcher, Arc::new(AbiRegistry::embedded()?));
//! let reconciler = Reconciler::new(Arc::new(MemoryDocumentStore::new()), verifier);
//! let services = Services::new(reconciler, None);
//!
//! let created = services.proposals.create(&dao, &tx_hash, &request, &caller).await?;
//! ```

pub mod error;
pub mod paths;
pub mod reconcile;
pub mod services;
pub mod store;

pub use error::*;
pub use reconcile::{
    CreatedEntity, Reconcilable, Reconciler, TransitionSpec, VerifiedTransition, VerifyAndReconcile,
    VoteOutcome, VoteSpec,
};
pub use services::{ListOptions, Services};
pub use store::{
    CollectionPath, Direction, DocumentData, DocumentPath, DocumentStore, FilterOp,
    MemoryDocumentStore, Query, Snapshot, Write,
};
