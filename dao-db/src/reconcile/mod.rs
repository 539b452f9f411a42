//! Verified reconciliation
//!
//! Every write that mirrors an on-chain action runs the same pipeline:
//!
//! 1. verify the transaction and locate the expected event,
//! 2. cross-check the decoded fields against the request and the caller,
//! 3. derive the document and write it in one mutation.
//!
//! When the DAO document records a module's contract address under
//! `modules.<ContractName>.address`, events for that module are only accepted
//! from that contract.
//!
//! Nothing reaches the store unless steps 1 and 2 pass. Entity kinds plug
//! in through [`Reconcilable`]; votes and post-creation transitions have
//! their own shared routines in [`vote`] and [`transition`].

pub mod transition;
pub mod vote;

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, Expectation, TransactionVerifier, VerifiedTx};
use dao_core::{
    entity_doc_id, parse_address, CallerIdentity, CanonicalAddress, DaoError, DaoResult, EntityKind,
};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

use crate::paths;
use crate::store::{DocumentData, DocumentPath, DocumentStore, Snapshot};

pub use transition::{TransitionSpec, VerifiedTransition};
pub use vote::{VoteOutcome, VoteSpec};

/// Store and verifier shared by every reconciling service
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    verifier: TransactionVerifier,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DocumentStore>, verifier: TransactionVerifier) -> Self {
        Self { store, verifier }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn verifier(&self) -> &TransactionVerifier {
        &self.verifier
    }

    /// The DAO document, which must exist
    pub async fn require_dao(&self, dao: &Address) -> DaoResult<Snapshot> {
        self.store
            .get(&paths::dao(dao))
            .await?
            .ok_or_else(|| DaoError::not_found(format!("DAO {} not found", dao.canonical())))
    }

    /// Verify `tx_hash` carries `event` from the DAO's `module` contract
    ///
    /// Returns the module address used, for matching secondary events.
    pub async fn verify_module_event(
        &self,
        dao: &Address,
        tx_hash: &B256,
        module: AbiModule,
        event: &str,
    ) -> DaoResult<(VerifiedTx, Option<Address>)> {
        let emitter = module_address(&self.require_dao(dao).await?, module)?;
        let tx = self
            .verifier
            .verify(tx_hash, &Expectation::event(module, event).emitted_by(emitter))
            .await?;
        Ok((tx, emitter))
    }

    /// An entity document, which must exist
    pub async fn require_entity(
        &self,
        dao: &Address,
        kind: EntityKind,
        id: &str,
    ) -> DaoResult<Snapshot> {
        self.store
            .get(&paths::entity(dao, kind, id))
            .await?
            .ok_or_else(|| DaoError::not_found(format!("{} {} not found", kind, id)))
    }
}

/// An entity created from a verified event
///
/// Implemented by the validated create request of each entity kind.
pub trait Reconcilable: Send + Sync {
    const KIND: EntityKind;
    const MODULE: AbiModule;
    const EVENT: &'static str;

    /// Checks between the decoded event, the request and the caller
    fn check(&self, tx: &VerifiedTx, event: &DecodedEvent, caller: &CallerIdentity) -> DaoResult<()>;

    /// Chain-assigned identifier
    fn entity_id(&self, event: &DecodedEvent) -> DaoResult<U256> {
        event.uint(Self::KIND.id_field())
    }

    /// Entity-specific fields of the stored document
    fn document(
        &self,
        tx: &VerifiedTx,
        event: &DecodedEvent,
        caller: &CallerIdentity,
    ) -> DaoResult<DocumentData>;
}

/// Contract address the DAO document records for `module`, if any
///
/// Accepts `modules.<ContractName>` as either an address string or an object
/// with an `address` field.
pub fn module_address(dao: &Snapshot, module: AbiModule) -> DaoResult<Option<Address>> {
    let entry = match dao.get("modules").and_then(|m| m.get(module.contract_name())) {
        Some(entry) => entry,
        None => return Ok(None),
    };
    let raw = match entry {
        Value::String(raw) => raw.as_str(),
        other => match other.get("address").and_then(Value::as_str) {
            Some(raw) => raw,
            None => return Ok(None),
        },
    };
    parse_address(module.contract_name(), raw)
        .map(Some)
        .map_err(|e| DaoError::Storage(format!("DAO {} module address: {}", dao.id(), e)))
}

/// Result of a verified create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntity {
    pub entity_id: String,
    pub tx_hash: String,
}

/// Numeric id as stored in the document: a JSON number when it fits
pub fn id_value(id: &U256) -> Value {
    match u64::try_from(*id) {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(id.to_string()),
    }
}

/// Decoded id must be the one addressed by the request
pub fn ensure_entity_id(kind: EntityKind, event: &DecodedEvent, expected: &U256) -> DaoResult<()> {
    let decoded = event.uint(kind.id_field())?;
    dao_core::consistency::ensure_value_matches(kind.id_field(), expected, &decoded)
}

/// Create pipeline for one entity kind
pub struct VerifyAndReconcile<T> {
    reconciler: Reconciler,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for VerifyAndReconcile<T> {
    fn clone(&self) -> Self {
        Self {
            reconciler: self.reconciler.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Reconcilable> VerifyAndReconcile<T> {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            _entity: PhantomData,
        }
    }

    /// Verify `tx_hash` against `request`, then write the entity document
    ///
    /// An entity already reconciled under the same chain id is returned as
    /// stored. Votes, signatures and status written since creation survive a
    /// resubmitted create.
    pub async fn create(
        &self,
        dao: &Address,
        tx_hash: &B256,
        request: &T,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        let (tx, _) = self
            .reconciler
            .verify_module_event(dao, tx_hash, T::MODULE, T::EVENT)
            .await?;
        let event = tx.event()?;

        request.check(&tx, event, caller)?;

        let id = request.entity_id(event)?;
        let entity_id = entity_doc_id(&id);
        let path: DocumentPath = paths::entity(dao, T::KIND, &entity_id);

        if let Some(existing) = self.reconciler.store.get(&path).await? {
            debug!(
                dao = %dao,
                entity_id = %entity_id,
                tx_hash = %tx_hash,
                "{} already reconciled, leaving it untouched",
                T::KIND
            );
            return Ok(CreatedEntity {
                tx_hash: existing
                    .get_str("txHash")
                    .map(str::to_string)
                    .unwrap_or_else(|| tx_hash.to_string()),
                entity_id,
            });
        }

        let data = request
            .document(&tx, event, caller)?
            .set(T::KIND.id_field(), id_value(&id))
            .set("daoAddress", dao.canonical())
            .set("txHash", tx_hash.to_string())
            .set("blockNumber", tx.receipt.block_number)
            .set("createdBy", caller.uid.clone())
            .server_timestamp("createdAt");

        self.reconciler.store.set(&path, data).await?;

        info!(
            dao = %dao,
            entity_id = %entity_id,
            tx_hash = %tx_hash,
            uid = %caller.uid,
            "{} created",
            T::KIND
        );

        Ok(CreatedEntity {
            entity_id,
            tx_hash: tx_hash.to_string(),
        })
    }
}
