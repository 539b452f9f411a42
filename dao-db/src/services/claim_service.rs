//! Claim Service
//!
//! Reimbursement claims. Same lifecycle as proposals, plus an amount that
//! must equal the on-chain `uint256` exactly.

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::consistency::{
    ensure_caller_is_actor, ensure_sender_is_actor, ensure_text_matches, ensure_value_matches,
};
use dao_core::{CallerIdentity, CanonicalAddress, DaoResult, EntityKind, VoteChoice, VoteStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{get_entity, list_entities, ListOptions};
use crate::reconcile::vote::CLAIM_VOTES;
use crate::reconcile::{CreatedEntity, Reconcilable, Reconciler, VerifyAndReconcile, VoteOutcome};
use crate::store::{Direction, DocumentData, DocumentStore};

/// Validated create-claim payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub title: String,
    pub description: String,
    pub amount: U256,
}

impl Reconcilable for NewClaim {
    const KIND: EntityKind = EntityKind::Claim;
    const MODULE: AbiModule = AbiModule::ClaimVoting;
    const EVENT: &'static str = "ClaimCreated";

    fn check(&self, tx: &VerifiedTx, event: &DecodedEvent, caller: &CallerIdentity) -> DaoResult<()> {
        let claimant = event.address("claimant")?;
        ensure_sender_is_actor(&tx.sender(), &claimant, "claimant")?;
        ensure_caller_is_actor(caller.wallet.as_ref(), &claimant, "claimant")?;
        ensure_value_matches("amount", &self.amount, &event.uint("amount")?)?;
        ensure_text_matches("title", &self.title, event.string("title")?)?;
        ensure_text_matches("description", &self.description, event.string("description")?)
    }

    fn document(
        &self,
        _tx: &VerifiedTx,
        event: &DecodedEvent,
        _caller: &CallerIdentity,
    ) -> DaoResult<DocumentData> {
        Ok(DocumentData::new()
            .set("title", self.title.clone())
            .set("description", self.description.clone())
            // Decimal string, amounts exceed f64 precision
            .set("amount", self.amount.to_string())
            .set("claimant", event.address("claimant")?.canonical())
            .set("status", VoteStatus::Pending.as_str())
            .set("approveCount", 0)
            .set("rejectCount", 0)
            .set("voters", json!([]))
            .set("votes", json!({})))
    }
}

#[derive(Clone)]
pub struct ClaimService {
    reconciler: Reconciler,
    creates: VerifyAndReconcile<NewClaim>,
}

impl ClaimService {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            creates: VerifyAndReconcile::new(reconciler.clone()),
            reconciler,
        }
    }

    fn store(&self) -> &Arc<dyn DocumentStore> {
        self.reconciler.store()
    }

    pub async fn create(
        &self,
        dao: &Address,
        tx_hash: &B256,
        request: &NewClaim,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        self.creates.create(dao, tx_hash, request, caller).await
    }

    pub async fn list(&self, dao: &Address, options: &ListOptions) -> DaoResult<Vec<Value>> {
        list_entities(
            self.store().as_ref(),
            dao,
            EntityKind::Claim,
            "createdAt",
            Direction::Desc,
            options,
        )
        .await
    }

    pub async fn get(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        get_entity(self.store().as_ref(), dao, EntityKind::Claim, id).await
    }

    pub async fn votes(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        let claim = self.reconciler.require_entity(dao, EntityKind::Claim, id).await?;
        Ok(claim.get("votes").cloned().unwrap_or_else(|| json!({})))
    }

    pub async fn vote(
        &self,
        dao: &Address,
        id: &U256,
        tx_hash: &B256,
        choice: VoteChoice,
        caller: &CallerIdentity,
    ) -> DaoResult<VoteOutcome> {
        self.reconciler
            .record_vote(&CLAIM_VOTES, dao, id, tx_hash, choice, caller)
            .await
    }
}
