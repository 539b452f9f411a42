//! Post-creation transitions (status change, edit, delete)

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::{entity_doc_id, DaoResult, EntityKind};
use tracing::debug;

use super::{ensure_entity_id, Reconciler};
use crate::store::Snapshot;

/// Event that authorizes one kind of transition
#[derive(Debug, Clone, Copy)]
pub struct TransitionSpec {
    pub kind: EntityKind,
    pub module: AbiModule,
    pub event: &'static str,
}

impl TransitionSpec {
    pub const fn new(kind: EntityKind, module: AbiModule, event: &'static str) -> Self {
        Self { kind, module, event }
    }
}

/// A transition that passed verification, ready to be applied
#[derive(Debug, Clone)]
pub struct VerifiedTransition {
    pub tx: VerifiedTx,
    pub event: DecodedEvent,
    pub entity: Snapshot,
    /// Module contract the event was required to come from
    pub emitter: Option<Address>,
}

impl Reconciler {
    /// Verify `tx_hash` carries `spec.event` for `entity_id` and load the entity
    ///
    /// Callers run their own value checks on the returned event before writing.
    pub async fn verify_transition(
        &self,
        spec: &TransitionSpec,
        dao: &Address,
        entity_id: &U256,
        tx_hash: &B256,
    ) -> DaoResult<VerifiedTransition> {
        let (tx, emitter) = self
            .verify_module_event(dao, tx_hash, spec.module, spec.event)
            .await?;
        let event = tx.event()?.clone();
        ensure_entity_id(spec.kind, &event, entity_id)?;

        let entity = self
            .require_entity(dao, spec.kind, &entity_doc_id(entity_id))
            .await?;
        debug!(tx_hash = %tx_hash, event = spec.event, entity_id = %entity_id, "Transition verified");

        Ok(VerifiedTransition {
            tx,
            event,
            entity,
            emitter,
        })
    }
}
