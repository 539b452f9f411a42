//! Proposal Service
//!
//! Proposals are created by `ProposalCreated` and decided by `VoteCast`
//! transactions, optionally accompanied by `ProposalFinalized`.

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::consistency::{ensure_caller_is_actor, ensure_sender_is_actor, ensure_text_matches};
use dao_core::{CallerIdentity, CanonicalAddress, DaoResult, EntityKind, VoteChoice, VoteStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{get_entity, list_entities, ListOptions};
use crate::reconcile::vote::PROPOSAL_VOTES;
use crate::reconcile::{CreatedEntity, Reconcilable, Reconciler, VerifyAndReconcile, VoteOutcome};
use crate::store::{Direction, DocumentData, DocumentStore};

/// Validated create-proposal payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProposal {
    pub title: String,
    pub description: String,
}

impl Reconcilable for NewProposal {
    const KIND: EntityKind = EntityKind::Proposal;
    const MODULE: AbiModule = AbiModule::ProposalVoting;
    const EVENT: &'static str = "ProposalCreated";

    fn check(&self, tx: &VerifiedTx, event: &DecodedEvent, caller: &CallerIdentity) -> DaoResult<()> {
        let proposer = event.address("proposer")?;
        ensure_sender_is_actor(&tx.sender(), &proposer, "proposer")?;
        ensure_caller_is_actor(caller.wallet.as_ref(), &proposer, "proposer")?;
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
            .set("proposer", event.address("proposer")?.canonical())
            .set("status", VoteStatus::Pending.as_str())
            .set("approveCount", 0)
            .set("rejectCount", 0)
            .set("voters", json!([]))
            .set("votes", json!({})))
    }
}

/// Proposal reads and verified writes
#[derive(Clone)]
pub struct ProposalService {
    reconciler: Reconciler,
    creates: VerifyAndReconcile<NewProposal>,
}

impl ProposalService {
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
        request: &NewProposal,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        self.creates.create(dao, tx_hash, request, caller).await
    }

    /// Newest first
    pub async fn list(&self, dao: &Address, options: &ListOptions) -> DaoResult<Vec<Value>> {
        list_entities(
            self.store().as_ref(),
            dao,
            EntityKind::Proposal,
            "createdAt",
            Direction::Desc,
            options,
        )
        .await
    }

    pub async fn get(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        get_entity(self.store().as_ref(), dao, EntityKind::Proposal, id).await
    }

    /// Vote map keyed by voter address
    pub async fn votes(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        let proposal = self
            .reconciler
            .require_entity(dao, EntityKind::Proposal, id)
            .await?;
        Ok(proposal.get("votes").cloned().unwrap_or_else(|| json!({})))
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
            .record_vote(&PROPOSAL_VOTES, dao, id, tx_hash, choice, caller)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use crate::services::testing::*;
    use alloy_dyn_abi::DynSolValue;
    use dao_core::{DaoError, Precondition};

    fn budget() -> NewProposal {
        NewProposal {
            title: "Budget".to_string(),
            description: "Q1".to_string(),
        }
    }

    fn created(h: &Harness, id: u64, proposer: Address, title: &str) -> dao_chain::RawLog {
        h.log(
            AbiModule::ProposalVoting,
            "ProposalCreated",
            vec![uint(id), addr(proposer), text(title), text("Q1")],
        )
    }

    fn vote_cast(h: &Harness, id: u64, voter: Address, approve: bool) -> dao_chain::RawLog {
        h.log(
            AbiModule::ProposalVoting,
            "VoteCast",
            vec![uint(id), addr(voter), DynSolValue::Bool(approve)],
        )
    }

    async fn seeded(h: &Harness, service: &ProposalService) {
        let tx = h.receipt(1, ALICE, true, vec![created(h, 7, ALICE, "Budget")]);
        service
            .create(&DAO, &tx, &budget(), &caller("alice", ALICE))
            .await
            .unwrap();
    }

    // ============ Create Tests ============

    #[tokio::test]
    async fn test_create_matching_proposal() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        let tx = h.receipt(1, ALICE, true, vec![created(&h, 7, ALICE, "Budget")]);

        let created = service
            .create(&DAO, &tx, &budget(), &caller("alice", ALICE))
            .await
            .unwrap();
        assert_eq!(created.entity_id, "7");

        let doc = service.get(&DAO, "7").await.unwrap();
        assert_eq!(doc["status"], "pending");
        assert_eq!(doc["proposalId"], 7);
        assert_eq!(doc["proposer"], ALICE.canonical());
        assert_eq!(doc["createdBy"], "alice");
        assert_eq!(doc["txHash"], tx.to_string());
        assert!(doc["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_create_rejects_edited_title() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        let tx = h.receipt(1, ALICE, true, vec![created(&h, 7, ALICE, "Budget")]);
        let before = h.document_count();

        let request = NewProposal {
            title: "Budget!!".to_string(),
            ..budget()
        };
        let err = service
            .create(&DAO, &tx, &request, &caller("alice", ALICE))
            .await
            .unwrap_err();

        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "title"));
        assert_eq!(h.document_count(), before);
    }

    #[tokio::test]
    async fn test_create_rejects_borrowed_transaction() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        // Alice's transaction submitted by Bob
        let tx = h.receipt(1, ALICE, true, vec![created(&h, 7, ALICE, "Budget")]);

        let err = service
            .create(&DAO, &tx, &budget(), &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "proposer"));
    }

    #[tokio::test]
    async fn test_replayed_create_keeps_votes_and_status() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let finalized = h.log(
            AbiModule::ProposalVoting,
            "ProposalFinalized",
            vec![uint(7), DynSolValue::Bool(true)],
        );
        let vote_tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, true), finalized]);
        service
            .vote(&DAO, &U256::from(7), &vote_tx, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap();
        let count = h.document_count();

        // Original create transaction submitted again
        let replayed = service
            .create(&DAO, &B256::repeat_byte(1), &budget(), &caller("alice", ALICE))
            .await
            .unwrap();
        assert_eq!(replayed.entity_id, "7");
        assert_eq!(replayed.tx_hash, B256::repeat_byte(1).to_string());

        assert_eq!(h.document_count(), count);
        assert_eq!(service.list(&DAO, &ListOptions::default()).await.unwrap().len(), 1);
        let doc = service.get(&DAO, "7").await.unwrap();
        assert_eq!(doc["status"], "approved");
        assert_eq!(doc["approveCount"], 1);
        assert_eq!(doc["voters"], serde_json::json!([BOB.canonical()]));

        let err = service
            .vote(&DAO, &U256::from(7), &vote_tx, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::StatePrecondition(_)));
    }

    async fn register(h: &Harness, module: Address) {
        h.store
            .update(
                &paths::dao(&DAO),
                crate::store::DocumentData::new()
                    .set("modules.ProposalVotingModule.address", module.canonical()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_events_must_come_from_registered_module() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());

        // Logs in the harness are emitted by CONTRACT
        register(&h, CAROL).await;
        let tx = h.receipt(1, ALICE, true, vec![created(&h, 7, ALICE, "Budget")]);
        let err = service
            .create(&DAO, &tx, &budget(), &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::EventNotFound { .. }));
        assert!(service.get(&DAO, "7").await.is_err());

        register(&h, CONTRACT).await;
        service
            .create(&DAO, &tx, &budget(), &caller("alice", ALICE))
            .await
            .unwrap();

        register(&h, CAROL).await;
        let vote_tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, true)]);
        let err = service
            .vote(&DAO, &U256::from(7), &vote_tx, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::EventNotFound { .. }));
        assert_eq!(service.get(&DAO, "7").await.unwrap()["approveCount"], 0);
    }

    #[tokio::test]
    async fn test_reverted_create_writes_nothing() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        let tx = h.receipt(1, ALICE, false, vec![created(&h, 7, ALICE, "Budget")]);
        let before = h.document_count();

        let err = service
            .create(&DAO, &tx, &budget(), &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::TxReverted(_)));
        assert_eq!(h.document_count(), before);
    }

    #[tokio::test]
    async fn test_create_in_unknown_dao() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        let tx = h.receipt(1, ALICE, true, vec![created(&h, 7, ALICE, "Budget")]);

        let err = service
            .create(&BOB, &tx, &budget(), &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::NotFound(_)));
    }

    // ============ Vote Tests ============

    #[tokio::test]
    async fn test_vote_with_finalization_is_one_update() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let finalized = h.log(
            AbiModule::ProposalVoting,
            "ProposalFinalized",
            vec![uint(7), DynSolValue::Bool(true)],
        );
        let tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, true), finalized]);

        let outcome = service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap();
        assert!(outcome.is_finalized);
        assert_eq!(outcome.status, VoteStatus::Approved);

        let doc = service.get(&DAO, "7").await.unwrap();
        assert_eq!(doc["status"], "approved");
        assert_eq!(doc["approveCount"], 1);
        assert_eq!(doc["finalizedTxHash"], tx.to_string());
        let votes = service.votes(&DAO, "7").await.unwrap();
        assert_eq!(votes[BOB.canonical()]["approve"], true);
        assert_eq!(votes[BOB.canonical()]["txHash"], tx.to_string());
    }

    #[tokio::test]
    async fn test_vote_without_finalization_stays_pending() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, false)]);
        let outcome = service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Reject, &caller("bob", BOB))
            .await
            .unwrap();
        assert!(!outcome.is_finalized);
        assert_eq!(outcome.status, VoteStatus::Pending);

        let doc = service.get(&DAO, "7").await.unwrap();
        assert_eq!(doc["rejectCount"], 1);
        assert_eq!(doc["voters"], json!([BOB.canonical()]));
    }

    #[tokio::test]
    async fn test_second_vote_from_same_wallet_rejected() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let first = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, true)]);
        service
            .vote(&DAO, &U256::from(7), &first, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap();

        let second = h.receipt(3, BOB, true, vec![vote_cast(&h, 7, BOB, true)]);
        let err = service
            .vote(&DAO, &U256::from(7), &second, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::AlreadyVoted { .. })
        ));
        assert_eq!(service.get(&DAO, "7").await.unwrap()["approveCount"], 1);
    }

    #[tokio::test]
    async fn test_proposer_cannot_vote() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, ALICE, true, vec![vote_cast(&h, 7, ALICE, true)]);
        let err = service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Approve, &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::SelfVote { .. })
        ));
    }

    #[tokio::test]
    async fn test_voter_must_be_callers_wallet() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, true)]);
        let err = service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Approve, &caller("carol", CAROL))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "voter"));

        let doc = h
            .store
            .require(&paths::entity(&DAO, EntityKind::Proposal, "7"))
            .await
            .unwrap();
        assert_eq!(doc.get("voters"), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_vote_direction_and_id_must_match() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, true)]);
        let wrong_choice = service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Reject, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(wrong_choice, DaoError::FieldMismatch { ref field, .. } if field == "voteType"));

        let wrong_id = service
            .vote(&DAO, &U256::from(8), &tx, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(wrong_id, DaoError::FieldMismatch { ref field, .. } if field == "proposalId"));
    }

    #[tokio::test]
    async fn test_vote_on_closed_proposal_rejected() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let finalized = h.log(
            AbiModule::ProposalVoting,
            "ProposalFinalized",
            vec![uint(7), DynSolValue::Bool(false)],
        );
        let tx = h.receipt(2, BOB, true, vec![vote_cast(&h, 7, BOB, false), finalized]);
        service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Reject, &caller("bob", BOB))
            .await
            .unwrap();

        let late = h.receipt(3, CAROL, true, vec![vote_cast(&h, 7, CAROL, true)]);
        let err = service
            .vote(&DAO, &U256::from(7), &late, VoteChoice::Approve, &caller("carol", CAROL))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::UnexpectedStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_vote_event() {
        let h = Harness::new().await;
        let service = ProposalService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, BOB, true, vec![created(&h, 9, BOB, "Other")]);
        let err = service
            .vote(&DAO, &U256::from(7), &tx, VoteChoice::Approve, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::EventNotFound { .. }));
    }
}
