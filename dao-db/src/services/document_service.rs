//! Document Signing Service
//!
//! Documents collect signatures until the contract executes them. A signing
//! transaction may also carry `DocumentExecuted`, in which case the signature,
//! the counter and the execution flag are committed together.

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::consistency::{ensure_caller_is_actor, ensure_sender_is_actor, ensure_text_matches};
use dao_core::{
    entity_doc_id, CallerIdentity, CanonicalAddress, DaoResult, EntityKind, Precondition,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{get_entity, render, ListOptions};
use crate::paths;
use crate::reconcile::{CreatedEntity, Reconcilable, Reconciler, TransitionSpec, VerifyAndReconcile};
use crate::store::{Direction, DocumentData, DocumentStore, FilterOp, Query, Write};

const SIGNED: TransitionSpec =
    TransitionSpec::new(EntityKind::Document, AbiModule::DocumentSigning, "DocumentSigned");

/// Validated create-document payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub ipfs_hash: String,
    pub required_signers: u64,
}

impl Reconcilable for NewDocument {
    const KIND: EntityKind = EntityKind::Document;
    const MODULE: AbiModule = AbiModule::DocumentSigning;
    const EVENT: &'static str = "DocumentCreated";

    fn check(&self, tx: &VerifiedTx, event: &DecodedEvent, _caller: &CallerIdentity) -> DaoResult<()> {
        ensure_sender_is_actor(&tx.sender(), &event.address("creator")?, "creator")?;
        ensure_text_matches("title", &self.title, event.string("title")?)
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
            .set("ipfsHash", self.ipfs_hash.clone())
            .set("creator", event.address("creator")?.canonical())
            .set("requiredSigners", self.required_signers)
            .set("signedCount", 0)
            .set("isExecuted", false))
    }
}

/// Which documents a listing returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFilter {
    #[default]
    All,
    Pending,
    Executed,
}

/// Result of a recorded signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutcome {
    pub document_executed: bool,
}

#[derive(Clone)]
pub struct DocumentService {
    reconciler: Reconciler,
    creates: VerifyAndReconcile<NewDocument>,
}

impl DocumentService {
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
        request: &NewDocument,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        self.creates.create(dao, tx_hash, request, caller).await
    }

    /// Newest first, optionally restricted by execution state
    pub async fn list(
        &self,
        dao: &Address,
        filter: DocumentFilter,
        options: &ListOptions,
    ) -> DaoResult<Vec<Value>> {
        let mut query = Query::new(paths::entities(dao, EntityKind::Document));
        query = match filter {
            DocumentFilter::All => query,
            DocumentFilter::Pending => query.filter("isExecuted", FilterOp::Eq, false),
            DocumentFilter::Executed => query.filter("isExecuted", FilterOp::Eq, true),
        };
        let query = options.apply(query.order_by("createdAt", Direction::Desc));
        Ok(render(self.store().query(&query).await?))
    }

    pub async fn get(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        get_entity(self.store().as_ref(), dao, EntityKind::Document, id).await
    }

    /// Signatures collected so far
    pub async fn signatures(&self, dao: &Address, id: &str) -> DaoResult<Vec<Value>> {
        self.reconciler.require_entity(dao, EntityKind::Document, id).await?;
        let query = Query::new(paths::signatures(dao, id)).order_by("timestamp", Direction::Asc);
        Ok(render(self.store().query(&query).await?))
    }

    pub async fn sign(
        &self,
        dao: &Address,
        id: &U256,
        tx_hash: &B256,
        caller: &CallerIdentity,
    ) -> DaoResult<SignOutcome> {
        let verified = self.reconciler.verify_transition(&SIGNED, dao, id, tx_hash).await?;
        let signer = verified.event.address("signer")?;
        ensure_sender_is_actor(&verified.tx.sender(), &signer, "signer")?;
        ensure_caller_is_actor(caller.wallet.as_ref(), &signer, "signer")?;

        let doc_id = entity_doc_id(id);
        if verified.entity.get_bool("isExecuted").unwrap_or(false) {
            return Err(Precondition::AlreadyExecuted(doc_id).into());
        }
        let signature_path = paths::signature(dao, &doc_id, &signer);
        if self.store().get(&signature_path).await?.is_some() {
            return Err(Precondition::AlreadySigned {
                document: doc_id,
                signer: signer.canonical(),
            }
            .into());
        }

        let executed = self
            .reconciler
            .verifier()
            .find_event_for(
                &verified.tx.receipt,
                AbiModule::DocumentSigning,
                "DocumentExecuted",
                verified.emitter,
                EntityKind::Document.id_field(),
                id,
            )?
            .is_some();

        let mut update = DocumentData::new()
            .increment("signedCount", 1)
            .server_timestamp("updatedAt");
        if executed {
            update = update
                .set("isExecuted", true)
                .set("executedTxHash", tx_hash.to_string())
                .server_timestamp("executedAt");
        }

        self.store()
            .commit(vec![
                Write::Set {
                    path: signature_path,
                    data: DocumentData::new()
                        .set("signerAddress", signer.canonical())
                        .set("txHash", tx_hash.to_string())
                        .set("uid", caller.uid.clone())
                        .server_timestamp("timestamp"),
                },
                Write::Update {
                    path: verified.entity.path.clone(),
                    data: update,
                },
            ])
            .await?;

        info!(
            dao = %dao,
            entity_id = %doc_id,
            actor = %signer.canonical(),
            tx_hash = %tx_hash,
            executed,
            "Document signed"
        );
        Ok(SignOutcome {
            document_executed: executed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::*;
    use dao_core::DaoError;

    fn request() -> NewDocument {
        NewDocument {
            title: "Charter".to_string(),
            description: "Founding charter".to_string(),
            ipfs_hash: "QmCharter".to_string(),
            required_signers: 2,
        }
    }

    async fn seeded(h: &Harness, service: &DocumentService) {
        let log = h.log(
            AbiModule::DocumentSigning,
            "DocumentCreated",
            vec![uint(4), addr(ALICE), text("Charter")],
        );
        let tx = h.receipt(1, ALICE, true, vec![log]);
        service
            .create(&DAO, &tx, &request(), &caller("alice", ALICE))
            .await
            .unwrap();
    }

    fn signed(h: &Harness, signer: Address) -> dao_chain::RawLog {
        h.log(AbiModule::DocumentSigning, "DocumentSigned", vec![uint(4), addr(signer)])
    }

    #[tokio::test]
    async fn test_sign_then_execute() {
        let h = Harness::new().await;
        let service = DocumentService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, BOB, true, vec![signed(&h, BOB)]);
        let outcome = service
            .sign(&DAO, &U256::from(4), &tx, &caller("bob", BOB))
            .await
            .unwrap();
        assert!(!outcome.document_executed);

        let executed = h.log(AbiModule::DocumentSigning, "DocumentExecuted", vec![uint(4)]);
        let tx = h.receipt(3, CAROL, true, vec![signed(&h, CAROL), executed]);
        let outcome = service
            .sign(&DAO, &U256::from(4), &tx, &caller("carol", CAROL))
            .await
            .unwrap();
        assert!(outcome.document_executed);

        let doc = service.get(&DAO, "4").await.unwrap();
        assert_eq!(doc["signedCount"], 2);
        assert_eq!(doc["isExecuted"], true);
        assert!(doc["executedAt"].is_string());

        let signatures = service.signatures(&DAO, "4").await.unwrap();
        assert_eq!(signatures.len(), 2);

        let executed_docs = service
            .list(&DAO, DocumentFilter::Executed, &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(executed_docs.len(), 1);
        let pending = service
            .list(&DAO, DocumentFilter::Pending, &ListOptions::default())
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_double_sign_rejected() {
        let h = Harness::new().await;
        let service = DocumentService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let first = h.receipt(2, BOB, true, vec![signed(&h, BOB)]);
        service
            .sign(&DAO, &U256::from(4), &first, &caller("bob", BOB))
            .await
            .unwrap();

        let second = h.receipt(3, BOB, true, vec![signed(&h, BOB)]);
        let err = service
            .sign(&DAO, &U256::from(4), &second, &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::AlreadySigned { .. })
        ));
        assert_eq!(service.get(&DAO, "4").await.unwrap()["signedCount"], 1);
    }

    #[tokio::test]
    async fn test_signing_executed_document_rejected() {
        let h = Harness::new().await;
        let service = DocumentService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let executed = h.log(AbiModule::DocumentSigning, "DocumentExecuted", vec![uint(4)]);
        let tx = h.receipt(2, BOB, true, vec![signed(&h, BOB), executed]);
        service
            .sign(&DAO, &U256::from(4), &tx, &caller("bob", BOB))
            .await
            .unwrap();

        let late = h.receipt(3, CAROL, true, vec![signed(&h, CAROL)]);
        let err = service
            .sign(&DAO, &U256::from(4), &late, &caller("carol", CAROL))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::AlreadyExecuted(_))
        ));
    }

    #[tokio::test]
    async fn test_signer_must_be_caller() {
        let h = Harness::new().await;
        let service = DocumentService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let tx = h.receipt(2, BOB, true, vec![signed(&h, BOB)]);
        let err = service
            .sign(&DAO, &U256::from(4), &tx, &caller("carol", CAROL))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "signer"));
        assert!(service.signatures(&DAO, "4").await.unwrap().is_empty());
    }
}
