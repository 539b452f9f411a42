//! DAO Service
//!
//! A DAO document is created from a verified `DaoCreated` factory event. The
//! DAO, its founding Admin membership and the creator's DAO index are written
//! in one commit.

use alloy_primitives::{Address, B256};
use dao_chain::{AbiModule, Expectation};
use dao_core::consistency::{ensure_sender_is_actor, ensure_text_matches};
use dao_core::{
    clamp_limit, CallerIdentity, CanonicalAddress, DaoError, DaoResult, MemberRole,
    DEFAULT_LIST_LIMIT,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::paths;
use crate::reconcile::Reconciler;
use crate::store::{Direction, DocumentData, DocumentStore, Query, Write};

/// Validated create-DAO payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDao {
    /// Free-form profile: name, description, logo and so on
    pub metadata: Value,
    pub modules: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDao {
    pub dao_address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaoSort {
    #[default]
    Recent,
    Popular,
}

/// Member-count band used to filter listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberCountBucket {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "1-10")]
    Small,
    #[serde(rename = "11-50")]
    Medium,
    #[serde(rename = "51-100")]
    Large,
    #[serde(rename = "100+")]
    Huge,
}

impl MemberCountBucket {
    pub fn contains(&self, count: i64) -> bool {
        match self {
            Self::Any => true,
            Self::Small => (1..=10).contains(&count),
            Self::Medium => (11..=50).contains(&count),
            Self::Large => (51..=100).contains(&count),
            Self::Huge => count > 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDaosOptions {
    pub limit: Option<usize>,
    pub start_after: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: DaoSort,
    #[serde(default)]
    pub member_count: MemberCountBucket,
}

/// Case-insensitive match of `needle` against the DAO name or description
pub(crate) fn matches_search(dao: &Value, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    ["name", "description"].iter().any(|key| {
        dao["metadata"][key]
            .as_str()
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

#[derive(Clone)]
pub struct DaoService {
    reconciler: Reconciler,
    factory: Option<Address>,
}

impl DaoService {
    pub fn new(reconciler: Reconciler, factory: Option<Address>) -> Self {
        Self { reconciler, factory }
    }

    fn store(&self) -> &Arc<dyn DocumentStore> {
        self.reconciler.store()
    }

    pub async fn create(
        &self,
        tx_hash: &B256,
        request: &NewDao,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedDao> {
        let expectation = Expectation::event(AbiModule::DaoFactory, "DaoCreated")
            .sent_to(self.factory)
            .emitted_by(self.factory);
        let tx = self.reconciler.verifier().verify(tx_hash, &expectation).await?;
        let event = tx.event()?;

        let dao = event.address("dao")?;
        let creator = event.address("creator")?;
        ensure_sender_is_actor(&tx.sender(), &creator, "creator")?;
        if let Some(name) = request.metadata.get("name").and_then(Value::as_str) {
            ensure_text_matches("name", name, event.string("name")?)?;
        }

        let dao_key = dao.canonical();
        debug!(tx_hash = %tx_hash, dao = %dao_key, "DAO creation verified");

        if self.store().get(&paths::dao(&dao)).await?.is_some() {
            debug!(dao = %dao_key, "DAO already reconciled, leaving it untouched");
            return Ok(CreatedDao { dao_address: dao_key });
        }

        self.store()
            .commit(vec![
                Write::Set {
                    path: paths::dao(&dao),
                    data: DocumentData::new()
                        .set("daoAddress", dao_key.clone())
                        .set("creator", creator.canonical())
                        .set("metadata", request.metadata.clone())
                        .set("modules", request.modules.clone())
                        .set("txHash", tx_hash.to_string())
                        .set("blockNumber", tx.receipt.block_number)
                        .set("memberCount", 1)
                        .set("createdBy", caller.uid.clone())
                        .server_timestamp("createdAt"),
                },
                Write::Set {
                    path: paths::member(&dao, &creator),
                    data: DocumentData::new()
                        .set("role", MemberRole::Admin.as_str())
                        .set("uid", caller.uid.clone())
                        .set("txHash", tx_hash.to_string())
                        .server_timestamp("joinedAt"),
                },
                Write::Merge {
                    path: paths::user(&caller.uid),
                    data: DocumentData::new().array_union("daos", vec![json!(dao_key)]),
                },
            ])
            .await?;

        info!(dao = %dao_key, actor = %creator.canonical(), tx_hash = %tx_hash, uid = %caller.uid, "DAO created");
        Ok(CreatedDao { dao_address: dao_key })
    }

    /// Search and member-count filters apply to the fetched page
    pub async fn list(&self, options: &ListDaosOptions) -> DaoResult<Vec<Value>> {
        let order_field = match options.sort_by {
            DaoSort::Recent => "createdAt",
            DaoSort::Popular => "memberCount",
        };
        let query = Query::new(paths::daos())
            .order_by(order_field, Direction::Desc)
            .start_after(options.start_after.clone())
            .limit(clamp_limit(options.limit, DEFAULT_LIST_LIMIT));

        let search = options
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        Ok(self
            .store()
            .query(&query)
            .await?
            .iter()
            .map(|s| s.with_id("id"))
            .filter(|dao| search.map(|needle| matches_search(dao, needle)).unwrap_or(true))
            .filter(|dao| {
                let count = dao["memberCount"].as_i64().unwrap_or(1);
                options.member_count.contains(count)
            })
            .collect())
    }

    pub async fn get(&self, dao: &Address) -> DaoResult<Value> {
        Ok(self.reconciler.require_dao(dao).await?.with_id("id"))
    }

    pub async fn modules(&self, dao: &Address) -> DaoResult<Value> {
        let snapshot = self.reconciler.require_dao(dao).await?;
        snapshot
            .get("modules")
            .cloned()
            .ok_or_else(|| DaoError::not_found(format!("DAO {} has no modules", dao.canonical())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::*;
    use alloy_primitives::address;

    const NEW_DAO: Address = address!("0x00000000000000000000000000000000000d0a01");

    fn request(name: &str) -> NewDao {
        NewDao {
            metadata: json!({ "name": name, "description": "Neighbourhood garden" }),
            modules: json!({ "proposalVoting": true, "calendar": true }),
        }
    }

    fn created(h: &Harness, seed: u8, dao: Address, creator: Address, name: &str) -> B256 {
        let log = h.log(AbiModule::DaoFactory, "DaoCreated", vec![addr(dao), addr(creator), text(name)]);
        h.receipt(seed, creator, true, vec![log])
    }

    #[tokio::test]
    async fn test_create_writes_dao_member_and_user_index() {
        let h = Harness::new().await;
        let service = DaoService::new(h.reconciler.clone(), Some(CONTRACT));
        let tx = created(&h, 1, NEW_DAO, ALICE, "Gardeners");

        let created = service
            .create(&tx, &request("Gardeners"), &caller("alice", ALICE))
            .await
            .unwrap();
        assert_eq!(created.dao_address, NEW_DAO.canonical());

        let dao = service.get(&NEW_DAO).await.unwrap();
        assert_eq!(dao["creator"], ALICE.canonical());
        assert_eq!(dao["memberCount"], 1);
        assert_eq!(service.modules(&NEW_DAO).await.unwrap()["calendar"], true);

        let admin = h.store.require(&paths::member(&NEW_DAO, &ALICE)).await.unwrap();
        assert_eq!(admin.get_str("role"), Some("Admin"));
        let user = h.store.require(&paths::user("alice")).await.unwrap();
        assert_eq!(user.get("daos"), Some(&json!([NEW_DAO.canonical()])));
    }

    #[tokio::test]
    async fn test_replayed_create_keeps_members() {
        let h = Harness::new().await;
        let service = DaoService::new(h.reconciler.clone(), Some(CONTRACT));
        let tx = created(&h, 1, NEW_DAO, ALICE, "Gardeners");
        service
            .create(&tx, &request("Gardeners"), &caller("alice", ALICE))
            .await
            .unwrap();

        h.store
            .commit(vec![
                Write::Set {
                    path: paths::member(&NEW_DAO, &BOB),
                    data: DocumentData::new().set("role", MemberRole::Member.as_str()),
                },
                Write::Update {
                    path: paths::dao(&NEW_DAO),
                    data: DocumentData::new().set("memberCount", 2),
                },
            ])
            .await
            .unwrap();

        let replayed = service
            .create(&tx, &request("Gardeners"), &caller("alice", ALICE))
            .await
            .unwrap();
        assert_eq!(replayed.dao_address, NEW_DAO.canonical());

        let dao = service.get(&NEW_DAO).await.unwrap();
        assert_eq!(dao["memberCount"], 2);
        assert!(h.store.get(&paths::member(&NEW_DAO, &BOB)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wrong_factory_rejected() {
        let h = Harness::new().await;
        let service = DaoService::new(h.reconciler.clone(), Some(BOB));
        let tx = created(&h, 1, NEW_DAO, ALICE, "Gardeners");

        let err = service
            .create(&tx, &request("Gardeners"), &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::TxWrongDestination { .. }));
        assert!(service.get(&NEW_DAO).await.is_err());
    }

    #[tokio::test]
    async fn test_name_must_match() {
        let h = Harness::new().await;
        let service = DaoService::new(h.reconciler.clone(), None);
        let tx = created(&h, 1, NEW_DAO, ALICE, "Gardeners");

        let err = service
            .create(&tx, &request("Growers"), &caller("alice", ALICE))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn test_list_search_and_buckets() {
        let h = Harness::new().await;
        let service = DaoService::new(h.reconciler.clone(), None);
        let tx = created(&h, 1, NEW_DAO, ALICE, "Gardeners");
        service
            .create(&tx, &request("Gardeners"), &caller("alice", ALICE))
            .await
            .unwrap();

        let found = service
            .list(&ListDaosOptions {
                search: Some("GARDEN".to_string()),
                ..ListDaosOptions::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], NEW_DAO.canonical());

        let big = service
            .list(&ListDaosOptions {
                member_count: MemberCountBucket::Medium,
                sort_by: DaoSort::Popular,
                ..ListDaosOptions::default()
            })
            .await
            .unwrap();
        assert!(big.is_empty());
    }

    #[test]
    fn test_bucket_bounds() {
        assert!(MemberCountBucket::Small.contains(10));
        assert!(!MemberCountBucket::Small.contains(11));
        assert!(MemberCountBucket::Large.contains(100));
        assert!(MemberCountBucket::Huge.contains(101));
        let parsed: MemberCountBucket = serde_json::from_str("\"51-100\"").unwrap();
        assert_eq!(parsed, MemberCountBucket::Large);
    }
}
