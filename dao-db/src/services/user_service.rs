//! User Service
//!
//! Profiles live at `users/{uid}`. A wallet is linked by proving control of
//! it with a personal-sign signature over a message naming the uid.
//! Notifications are written by other services under
//! `users/{uid}/notifications` and only read here.

use alloy_primitives::{Address, Signature};
use chrono::NaiveDate;
use dao_core::{
    clamp_limit, parse_address, wallet_link_message, CanonicalAddress, DaoError, DaoResult,
    Precondition, DEFAULT_USER_DAOS_LIMIT,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::dao_service::matches_search;
use crate::paths;
use crate::store::{Direction, DocumentData, DocumentStore, FilterOp, Query};

/// Paging for a user's DAO list; `page` is 1-based
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDaosOptions {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDaoPage {
    pub daos: Vec<Value>,
    pub total: usize,
    pub has_more: bool,
}

/// Editable personal details, also used to prefill payment flows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
}

impl ProfileUpdate {
    fn into_data(self) -> DaoResult<DocumentData> {
        if self.first_name.is_none() && self.last_name.is_none() && self.date_of_birth.is_none() {
            return Err(DaoError::validation("no profile fields to update"));
        }
        if let Some(raw) = &self.date_of_birth {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| DaoError::validation("dateOfBirth must be YYYY-MM-DD"))?;
        }
        Ok(DocumentData::new()
            .set_opt("firstName", self.first_name.map(|s| s.trim().to_string()))
            .set_opt("lastName", self.last_name.map(|s| s.trim().to_string()))
            .set_opt("dateOfBirth", self.date_of_birth)
            .server_timestamp("updatedAt"))
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, uid: &str) -> DaoResult<Value> {
        self.store
            .get(&paths::user(uid))
            .await?
            .map(|s| s.with_id("uid"))
            .ok_or_else(|| DaoError::not_found(format!("user {} not found", uid)))
    }

    /// Update personal details of an existing profile
    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> DaoResult<Value> {
        let data = update.into_data()?;
        self.store.update(&paths::user(uid), data).await?;
        debug!(uid = %uid, "Profile updated");
        self.profile(uid).await
    }

    /// Notifications for `uid`, newest first
    pub async fn notifications(&self, uid: &str) -> DaoResult<Vec<Value>> {
        let query = Query::new(paths::notifications(uid)).order_by("timestamp", Direction::Desc);
        Ok(self
            .store
            .query(&query)
            .await?
            .iter()
            .map(|s| s.with_id("notificationId"))
            .collect())
    }

    /// Wallet linked to `uid`, if any
    pub async fn wallet_of(&self, uid: &str) -> DaoResult<Option<Address>> {
        let Some(user) = self.store.get(&paths::user(uid)).await? else {
            return Ok(None);
        };
        match user.get_str("wallet.address") {
            Some(raw) => Ok(Some(parse_address("wallet.address", raw)?)),
            None => Ok(None),
        }
    }

    /// Link `address` to `uid` after checking `signature` recovers to it
    pub async fn connect_wallet(&self, uid: &str, address: &str, signature: &str) -> DaoResult<Address> {
        let wallet = parse_address("address", address)?;
        let recovered = recover_signer(uid, signature)?;
        if recovered != wallet {
            warn!(uid = %uid, claimed = %wallet.canonical(), recovered = %recovered.canonical(), "Wallet signature mismatch");
            return Err(DaoError::validation(format!(
                "signature was produced by {}, not {}",
                recovered.canonical(),
                wallet.canonical()
            )));
        }

        let key = wallet.canonical();
        let holders = self
            .store
            .query(&Query::new(paths::users()).filter("wallet.address", FilterOp::Eq, key.clone()))
            .await?;
        if holders.iter().any(|holder| holder.id() != uid) {
            return Err(Precondition::WalletLinkedElsewhere(key).into());
        }
        if let Some(current) = self.wallet_of(uid).await? {
            if current != wallet {
                return Err(Precondition::WalletAlreadyLinked.into());
            }
        }

        self.store
            .set_merge(
                &paths::user(uid),
                DocumentData::new()
                    .set("wallet.address", key.clone())
                    .server_timestamp("wallet.linkedAt"),
            )
            .await?;

        info!(uid = %uid, actor = %key, "Wallet linked");
        Ok(wallet)
    }

    /// DAOs the user belongs to, newest first
    pub async fn user_daos(&self, uid: &str, options: &UserDaosOptions) -> DaoResult<UserDaoPage> {
        let user = self
            .store
            .get(&paths::user(uid))
            .await?
            .ok_or_else(|| DaoError::not_found(format!("user {} not found", uid)))?;
        let wallet = match user.get_str("wallet.address") {
            Some(raw) => parse_address("wallet.address", raw)?,
            None => return Err(DaoError::validation("no wallet linked to this account")),
        };

        let search = options
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let listed: Vec<&str> = user
            .get("daos")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut daos = Vec::new();
        for raw in listed {
            let Ok(dao) = parse_address("dao", raw) else {
                debug!(uid = %uid, dao = raw, "Skipping malformed DAO reference");
                continue;
            };
            let Some(member) = self.store.get(&paths::member(&dao, &wallet)).await? else {
                continue;
            };
            let Some(snapshot) = self.store.get(&paths::dao(&dao)).await? else {
                continue;
            };
            let body = Value::Object(snapshot.data.clone());
            if let Some(needle) = search {
                if !matches_search(&body, needle) {
                    continue;
                }
            }
            let member_count = self.store.count(&Query::new(paths::members(&dao))).await?;
            daos.push(json!({
                "daoAddress": dao.canonical(),
                "metadata": body.get("metadata").cloned().unwrap_or(Value::Null),
                "creator": body.get("creator").cloned().unwrap_or(Value::Null),
                "createdAt": body.get("createdAt").cloned().unwrap_or(Value::Null),
                "modules": body.get("modules").cloned().unwrap_or(Value::Null),
                "role": member.get("role").cloned().unwrap_or(Value::Null),
                "memberCount": member_count,
            }));
        }

        daos.sort_by(|a, b| {
            let a = a["createdAt"].as_str().unwrap_or_default();
            let b = b["createdAt"].as_str().unwrap_or_default();
            b.cmp(a)
        });

        let total = daos.len();
        let limit = clamp_limit(options.limit, DEFAULT_USER_DAOS_LIMIT);
        let start = options.page.unwrap_or(1).max(1).saturating_sub(1).saturating_mul(limit);
        let page: Vec<Value> = daos.into_iter().skip(start).take(limit).collect();
        let has_more = start + page.len() < total;

        Ok(UserDaoPage {
            daos: page,
            total,
            has_more,
        })
    }

    /// Recompute every DAO's `memberCount` from its members collection
    pub async fn recount_members(&self) -> DaoResult<usize> {
        let daos = self.store.query(&Query::new(paths::daos())).await?;
        let mut updated = 0;
        for dao in &daos {
            let address = parse_address("dao", dao.id())?;
            let count = self.store.count(&Query::new(paths::members(&address))).await?;
            if dao.get_i64("memberCount") != Some(count as i64) {
                self.store
                    .update(&dao.path, DocumentData::new().set("memberCount", count))
                    .await?;
                info!(dao = %dao.id(), member_count = count, "Member count corrected");
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// Signer of the wallet-link message for `uid`
fn recover_signer(uid: &str, signature: &str) -> DaoResult<Address> {
    let bytes = hex::decode(signature.trim().trim_start_matches("0x"))
        .map_err(|_| DaoError::validation("signature is not valid hex"))?;
    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| DaoError::validation(format!("malformed signature: {}", e)))?;
    signature
        .recover_address_from_msg(wallet_link_message(uid))
        .map_err(|e| DaoError::validation(format!("signature recovery failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use alloy_primitives::address;

    // Personal-sign of "Link this wallet to my Anise account at uid-1"
    const SIGNER: Address = address!("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");
    const SIGNATURE: &str = "0x478591a3b55f76f9a7714f5ffa98bfab5256adf60a596f67bb4d66109f9486cd10061dfb5cb142c93456435ce5c8877304505f467b0eb1f78d51fe5eef2d21fb1c";

    fn service() -> (Arc<MemoryDocumentStore>, UserService) {
        let store = Arc::new(MemoryDocumentStore::new());
        (store.clone(), UserService::new(store))
    }

    #[test]
    fn test_recover_signer() {
        assert_eq!(recover_signer("uid-1", SIGNATURE).unwrap(), SIGNER);
        // Same signature over a different uid recovers someone else
        assert_ne!(recover_signer("uid-2", SIGNATURE).unwrap(), SIGNER);
        assert!(recover_signer("uid-1", "0x1234").is_err());
    }

    #[tokio::test]
    async fn test_connect_wallet() {
        let (_, users) = service();
        let linked = users
            .connect_wallet("uid-1", &SIGNER.to_string().to_lowercase(), SIGNATURE)
            .await
            .unwrap();
        assert_eq!(linked, SIGNER);
        assert_eq!(users.wallet_of("uid-1").await.unwrap(), Some(SIGNER));

        let profile = users.profile("uid-1").await.unwrap();
        assert_eq!(profile["wallet"]["address"], SIGNER.canonical());
        assert!(profile["wallet"]["linkedAt"].is_string());

        // Relinking the same wallet is a no-op
        users.connect_wallet("uid-1", &SIGNER.to_string(), SIGNATURE).await.unwrap();
    }

    #[tokio::test]
    async fn test_signature_for_other_address_rejected() {
        let (_, users) = service();
        let other = address!("0x0000000000000000000000000000000000000b0b");
        let err = users
            .connect_wallet("uid-1", &other.to_string(), SIGNATURE)
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::Validation(_)));
        assert_eq!(users.wallet_of("uid-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wallet_held_by_other_user() {
        let (store, users) = service();
        store
            .set(
                &paths::user("uid-9"),
                DocumentData::new().set("wallet.address", SIGNER.canonical()),
            )
            .await
            .unwrap();

        let err = users
            .connect_wallet("uid-1", &SIGNER.to_string(), SIGNATURE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::WalletLinkedElsewhere(_))
        ));
    }

    #[tokio::test]
    async fn test_user_with_different_wallet() {
        let (store, users) = service();
        let other = address!("0x0000000000000000000000000000000000000b0b");
        store
            .set(
                &paths::user("uid-1"),
                DocumentData::new().set("wallet.address", other.canonical()),
            )
            .await
            .unwrap();

        let err = users
            .connect_wallet("uid-1", &SIGNER.to_string(), SIGNATURE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DaoError::StatePrecondition(Precondition::WalletAlreadyLinked)
        ));
    }

    async fn seed_dao(store: &MemoryDocumentStore, dao: Address, name: &str, created: &str, members: &[Address]) {
        store
            .set(
                &paths::dao(&dao),
                DocumentData::new()
                    .set("metadata", json!({ "name": name }))
                    .set("createdAt", created)
                    .set("memberCount", 99),
            )
            .await
            .unwrap();
        for member in members {
            store
                .set(&paths::member(&dao, member), DocumentData::new().set("role", "Member"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_user_daos() {
        let (store, users) = service();
        let a = address!("0x00000000000000000000000000000000000000a1");
        let b = address!("0x00000000000000000000000000000000000000b2");
        let c = address!("0x00000000000000000000000000000000000000c3");
        let other = address!("0x0000000000000000000000000000000000000b0b");
        seed_dao(&store, a, "Alpha", "2026-01-01T00:00:00.000000Z", &[SIGNER]).await;
        seed_dao(&store, b, "Beta", "2026-02-01T00:00:00.000000Z", &[SIGNER, other]).await;
        // Listed but no longer a member
        seed_dao(&store, c, "Gamma", "2026-03-01T00:00:00.000000Z", &[other]).await;
        store
            .set(
                &paths::user("uid-1"),
                DocumentData::new()
                    .set("wallet.address", SIGNER.canonical())
                    .set("daos", json!([a.canonical(), b.canonical(), c.canonical()])),
            )
            .await
            .unwrap();

        let page = users
            .user_daos(
                "uid-1",
                &UserDaosOptions {
                    limit: Some(1),
                    ..UserDaosOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.has_more);
        assert_eq!(page.daos[0]["daoAddress"], b.canonical());
        assert_eq!(page.daos[0]["memberCount"], 2);
        assert_eq!(page.daos[0]["role"], "Member");

        let searched = users
            .user_daos(
                "uid-1",
                &UserDaosOptions {
                    search: Some("alp".to_string()),
                    ..UserDaosOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
        assert!(!searched.has_more);
    }

    #[tokio::test]
    async fn test_user_daos_requires_wallet() {
        let (store, users) = service();
        assert!(matches!(
            users.user_daos("ghost", &UserDaosOptions::default()).await,
            Err(DaoError::NotFound(_))
        ));

        store
            .set(&paths::user("uid-1"), DocumentData::new().set("daos", json!([])))
            .await
            .unwrap();
        assert!(matches!(
            users.user_daos("uid-1", &UserDaosOptions::default()).await,
            Err(DaoError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (store, users) = service();
        store
            .set(&paths::user("uid-1"), DocumentData::new().set("email", "a@example.com"))
            .await
            .unwrap();

        let profile = users
            .update_profile(
                "uid-1",
                ProfileUpdate {
                    first_name: Some(" Ada ".to_string()),
                    last_name: Some("Lovelace".to_string()),
                    date_of_birth: Some("1815-12-10".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(profile["firstName"], "Ada");
        assert_eq!(profile["dateOfBirth"], "1815-12-10");
        assert_eq!(profile["email"], "a@example.com");

        let err = users
            .update_profile(
                "uid-1",
                ProfileUpdate {
                    date_of_birth: Some("10/12/1815".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::Validation(_)));
        assert!(matches!(
            users.update_profile("uid-1", ProfileUpdate::default()).await,
            Err(DaoError::Validation(_))
        ));

        let missing = ProfileUpdate {
            first_name: Some("Ghost".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            users.update_profile("ghost", missing).await,
            Err(DaoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_notifications_newest_first() {
        let (store, users) = service();
        for (id, at) in [("n1", "2026-01-01T00:00:00.000000Z"), ("n2", "2026-03-01T00:00:00.000000Z")] {
            store
                .set(
                    &paths::notifications("uid-1").doc(id),
                    DocumentData::new().set("timestamp", at).set("message", id),
                )
                .await
                .unwrap();
        }

        let notifications = users.notifications("uid-1").await.unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0]["notificationId"], "n2");
        assert_eq!(notifications[1]["message"], "n1");
        assert!(users.notifications("uid-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recount_members() {
        let (store, users) = service();
        let a = address!("0x00000000000000000000000000000000000000a1");
        seed_dao(&store, a, "Alpha", "2026-01-01T00:00:00.000000Z", &[SIGNER]).await;

        assert_eq!(users.recount_members().await.unwrap(), 1);
        let dao = store.require(&paths::dao(&a)).await.unwrap();
        assert_eq!(dao.get_i64("memberCount"), Some(1));
        assert_eq!(users.recount_members().await.unwrap(), 0);
    }
}
