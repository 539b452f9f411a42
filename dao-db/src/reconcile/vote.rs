//! Vote recording for proposals and claims

use alloy_primitives::{Address, B256, U256};
use dao_chain::AbiModule;
use dao_core::consistency::{
    check_vote_preconditions, ensure_caller_is_actor, ensure_sender_is_actor, ensure_value_matches,
    VoteTarget,
};
use dao_core::{
    entity_doc_id, parse_address, CallerIdentity, CanonicalAddress, DaoError, DaoResult, EntityKind,
    VoteChoice, VoteStatus,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{ensure_entity_id, Reconciler};
use crate::paths;
use crate::store::DocumentData;

/// How a votable entity kind is wired to its contract module
#[derive(Debug, Clone, Copy)]
pub struct VoteSpec {
    pub kind: EntityKind,
    pub module: AbiModule,
    pub vote_event: &'static str,
    pub finalized_event: &'static str,
    /// Document field holding the creator, who may not vote
    pub creator_field: &'static str,
}

pub const PROPOSAL_VOTES: VoteSpec = VoteSpec {
    kind: EntityKind::Proposal,
    module: AbiModule::ProposalVoting,
    vote_event: "VoteCast",
    finalized_event: "ProposalFinalized",
    creator_field: "proposer",
};

pub const CLAIM_VOTES: VoteSpec = VoteSpec {
    kind: EntityKind::Claim,
    module: AbiModule::ClaimVoting,
    vote_event: "ClaimVoteCast",
    finalized_event: "ClaimFinalized",
    creator_field: "claimant",
};

/// Result of a recorded vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub is_finalized: bool,
    pub status: VoteStatus,
}

impl Reconciler {
    /// Verify a vote transaction and record it
    ///
    /// The vote entry, voter set, tallies and (when the same receipt carries
    /// the finalization event) the final status go out as one update.
    pub async fn record_vote(
        &self,
        spec: &VoteSpec,
        dao: &Address,
        entity_id: &U256,
        tx_hash: &B256,
        choice: VoteChoice,
        caller: &CallerIdentity,
    ) -> DaoResult<VoteOutcome> {
        let (tx, emitter) = self
            .verify_module_event(dao, tx_hash, spec.module, spec.vote_event)
            .await?;
        let event = tx.event()?;

        ensure_entity_id(spec.kind, event, entity_id)?;
        let voter = event.address("voter")?;
        ensure_sender_is_actor(&tx.sender(), &voter, "voter")?;
        ensure_caller_is_actor(caller.wallet.as_ref(), &voter, "voter")?;
        ensure_value_matches("voteType", &choice.is_approve(), &event.boolean("approve")?)?;

        let id = entity_doc_id(entity_id);
        let snapshot = self.require_entity(dao, spec.kind, &id).await?;
        let creator = snapshot
            .get_str(spec.creator_field)
            .ok_or_else(|| DaoError::Storage(format!("{} {} has no {}", spec.kind, id, spec.creator_field)))
            .and_then(|raw| parse_address(spec.creator_field, raw))?;
        let voters: Vec<String> = snapshot
            .get("voters")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let label = format!("{} {}", spec.kind, id);
        check_vote_preconditions(
            &VoteTarget {
                label: &label,
                status: snapshot.get_str("status").unwrap_or(VoteStatus::Pending.as_str()),
                creator: &creator,
                voters: &voters,
            },
            &voter,
        )?;

        let finalized = match self.verifier().find_event_for(
            &tx.receipt,
            spec.module,
            spec.finalized_event,
            emitter,
            spec.kind.id_field(),
            entity_id,
        )? {
            Some(fin) => Some(fin.boolean("approved")?),
            None => None,
        };
        debug!(tx_hash = %tx_hash, entity_id = %id, finalized = ?finalized, "Vote verified");

        let key = voter.canonical();
        let tally = if choice.is_approve() { "approveCount" } else { "rejectCount" };
        let mut data = DocumentData::new()
            .set(format!("votes.{}.approve", key), choice.is_approve())
            .set(format!("votes.{}.voteType", key), choice.as_str())
            .set(format!("votes.{}.txHash", key), tx_hash.to_string())
            .server_timestamp(format!("votes.{}.timestamp", key))
            .array_union("voters", vec![json!(key)])
            .increment(tally, 1)
            .server_timestamp("updatedAt");

        let status = match finalized {
            Some(approved) => {
                let status = VoteStatus::finalized(approved);
                data = data
                    .set("status", status.as_str())
                    .set("finalizedTxHash", tx_hash.to_string())
                    .server_timestamp("finalizedAt");
                status
            }
            None => VoteStatus::Pending,
        };

        self.store()
            .update(&paths::entity(dao, spec.kind, &id), data)
            .await?;

        info!(
            dao = %dao,
            entity_id = %id,
            actor = %key,
            tx_hash = %tx_hash,
            status = %status,
            "Vote recorded"
        );

        Ok(VoteOutcome {
            is_finalized: finalized.is_some(),
            status,
        })
    }
}
