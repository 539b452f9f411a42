//! Announcement Service

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::consistency::{ensure_sender_is_actor, ensure_text_matches, ensure_value_matches};
use dao_core::{
    AnnouncementType, CallerIdentity, CanonicalAddress, DaoError, DaoResult, EntityKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{get_entity, render, unix_field, ListOptions};
use crate::paths;
use crate::reconcile::{CreatedEntity, Reconcilable, Reconciler, TransitionSpec, VerifyAndReconcile};
use crate::store::{now_timestamp, Direction, DocumentData, DocumentStore, FilterOp, Query};

const UPDATED: TransitionSpec =
    TransitionSpec::new(EntityKind::Announcement, AbiModule::Announcement, "AnnouncementUpdated");
const DELETED: TransitionSpec =
    TransitionSpec::new(EntityKind::Announcement, AbiModule::Announcement, "AnnouncementDeleted");

/// Validated create-announcement payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    /// Checked against the on-chain type when given
    pub announcement_type: Option<AnnouncementType>,
    /// Unix seconds
    pub expires_at: Option<u64>,
}

fn decoded_type(event: &DecodedEvent) -> DaoResult<AnnouncementType> {
    let index = event.uint_u64("announcementType")?;
    AnnouncementType::from_index(index).ok_or_else(|| DaoError::FieldMismatch {
        field: "announcementType".to_string(),
        detail: format!("unknown on-chain announcement type {}", index),
    })
}

impl Reconcilable for NewAnnouncement {
    const KIND: EntityKind = EntityKind::Announcement;
    const MODULE: AbiModule = AbiModule::Announcement;
    const EVENT: &'static str = "AnnouncementCreated";

    fn check(&self, tx: &VerifiedTx, event: &DecodedEvent, _caller: &CallerIdentity) -> DaoResult<()> {
        ensure_sender_is_actor(&tx.sender(), &event.address("creator")?, "creator")?;
        ensure_text_matches("title", &self.title, event.string("title")?)?;
        let on_chain = decoded_type(event)?;
        match self.announcement_type {
            Some(submitted) => {
                ensure_value_matches("announcementType", &submitted.as_str(), &on_chain.as_str())
            }
            None => Ok(()),
        }
    }

    fn document(
        &self,
        _tx: &VerifiedTx,
        event: &DecodedEvent,
        _caller: &CallerIdentity,
    ) -> DaoResult<DocumentData> {
        let expires_at = self
            .expires_at
            .map(|secs| unix_field("expiresAt", secs))
            .transpose()?;
        Ok(DocumentData::new()
            .set("title", self.title.clone())
            .set("content", self.content.clone())
            .set("creator", event.address("creator")?.canonical())
            .set("announcementType", decoded_type(event)?.as_str())
            .set_opt("expiresAt", expires_at))
    }
}

/// Edit applied by an `AnnouncementUpdated` transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementUpdate {
    pub title: String,
    pub content: Option<String>,
    pub expires_at: Option<u64>,
}

#[derive(Clone)]
pub struct AnnouncementService {
    reconciler: Reconciler,
    creates: VerifyAndReconcile<NewAnnouncement>,
}

impl AnnouncementService {
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
        request: &NewAnnouncement,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        self.creates.create(dao, tx_hash, request, caller).await
    }

    /// Unexpired announcements, latest expiry first
    pub async fn list_active(&self, dao: &Address, options: &ListOptions) -> DaoResult<Vec<Value>> {
        let query = options.apply(
            Query::new(paths::entities(dao, EntityKind::Announcement))
                .filter("expiresAt", FilterOp::Gt, now_timestamp())
                .order_by("expiresAt", Direction::Desc),
        );
        Ok(render(self.store().query(&query).await?))
    }

    pub async fn get(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        get_entity(self.store().as_ref(), dao, EntityKind::Announcement, id).await
    }

    pub async fn update(
        &self,
        dao: &Address,
        id: &U256,
        update: &AnnouncementUpdate,
        tx_hash: &B256,
    ) -> DaoResult<()> {
        let verified = self.reconciler.verify_transition(&UPDATED, dao, id, tx_hash).await?;
        ensure_text_matches("title", &update.title, verified.event.string("title")?)?;

        let expires_at = update
            .expires_at
            .map(|secs| unix_field("expiresAt", secs))
            .transpose()?;
        let data = DocumentData::new()
            .set("title", update.title.clone())
            .set_opt("content", update.content.clone())
            .set_opt("expiresAt", expires_at)
            .set("updateTxHash", tx_hash.to_string())
            .server_timestamp("updatedAt");
        self.store().update(&verified.entity.path, data).await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, "Announcement updated");
        Ok(())
    }

    pub async fn delete(&self, dao: &Address, id: &U256, tx_hash: &B256) -> DaoResult<()> {
        let verified = self.reconciler.verify_transition(&DELETED, dao, id, tx_hash).await?;
        self.store().delete(&verified.entity.path).await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, "Announcement deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::*;

    const FUTURE: u64 = 10_000_000_000;

    fn request(title: &str, expires_at: Option<u64>) -> NewAnnouncement {
        NewAnnouncement {
            title: title.to_string(),
            content: "Details inside".to_string(),
            announcement_type: None,
            expires_at,
        }
    }

    async fn create(h: &Harness, service: &AnnouncementService, seed: u8, id: u64, title: &str, expires: Option<u64>) {
        let log = h.log(
            AbiModule::Announcement,
            "AnnouncementCreated",
            vec![uint(id), text(title), addr(ALICE), small_uint(1)],
        );
        let tx = h.receipt(seed, ALICE, true, vec![log]);
        service
            .create(&DAO, &tx, &request(title, expires), &caller("alice", ALICE))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_type_comes_from_chain() {
        let h = Harness::new().await;
        let service = AnnouncementService::new(h.reconciler.clone());
        create(&h, &service, 1, 1, "Outage", Some(FUTURE)).await;

        let doc = service.get(&DAO, "1").await.unwrap();
        assert_eq!(doc["announcementType"], "URGENT");
        assert_eq!(doc["announcementId"], 1);
    }

    #[tokio::test]
    async fn test_submitted_type_must_match() {
        let h = Harness::new().await;
        let service = AnnouncementService::new(h.reconciler.clone());
        let log = h.log(
            AbiModule::Announcement,
            "AnnouncementCreated",
            vec![uint(1), text("Outage"), addr(ALICE), small_uint(1)],
        );
        let tx = h.receipt(1, ALICE, true, vec![log]);

        let request = NewAnnouncement {
            announcement_type: Some(AnnouncementType::Info),
            ..request("Outage", None)
        };
        let err = service
            .create(&DAO, &tx, &request, &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "announcementType"));
    }

    #[tokio::test]
    async fn test_active_excludes_expired() {
        let h = Harness::new().await;
        let service = AnnouncementService::new(h.reconciler.clone());
        create(&h, &service, 1, 1, "Old", Some(1_000_000_000)).await;
        create(&h, &service, 2, 2, "Soon", Some(FUTURE)).await;
        create(&h, &service, 3, 3, "Later", Some(FUTURE * 2)).await;
        create(&h, &service, 4, 4, "Forever", None).await;

        let active = service.list_active(&DAO, &ListOptions::default()).await.unwrap();
        let titles: Vec<_> = active.iter().map(|a| a["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["Later", "Soon"]);
    }

    #[tokio::test]
    async fn test_update_checks_title() {
        let h = Harness::new().await;
        let service = AnnouncementService::new(h.reconciler.clone());
        create(&h, &service, 1, 1, "Outage", Some(FUTURE)).await;

        let updated = h.log(AbiModule::Announcement, "AnnouncementUpdated", vec![uint(1), text("Resolved")]);
        let tx = h.receipt(2, ALICE, true, vec![updated]);
        let wrong = AnnouncementUpdate {
            title: "Fixed".to_string(),
            ..AnnouncementUpdate::default()
        };
        assert!(service.update(&DAO, &U256::from(1), &wrong, &tx).await.is_err());

        let right = AnnouncementUpdate {
            title: "Resolved".to_string(),
            content: Some("All clear".to_string()),
            ..AnnouncementUpdate::default()
        };
        service.update(&DAO, &U256::from(1), &right, &tx).await.unwrap();
        assert_eq!(service.get(&DAO, "1").await.unwrap()["content"], "All clear");

        let deleted = h.log(AbiModule::Announcement, "AnnouncementDeleted", vec![uint(1)]);
        let tx = h.receipt(3, ALICE, true, vec![deleted]);
        service.delete(&DAO, &U256::from(1), &tx).await.unwrap();
        assert!(service.get(&DAO, "1").await.is_err());
    }
}
