//! Member Service
//!
//! Membership is requested on chain and approved or rejected on chain by an
//! existing member. A wallet is never both a member and a pending requester.

use alloy_primitives::{Address, B256};
use dao_chain::AbiModule;
use dao_core::consistency::{
    ensure_caller_is_actor, ensure_sender_is_actor, ensure_status, ensure_value_matches,
};
use dao_core::{
    CallerIdentity, CanonicalAddress, DaoError, DaoResult, JoinRequestStatus, MemberRole,
    Precondition,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::render;
use crate::paths;
use crate::reconcile::Reconciler;
use crate::store::{Direction, DocumentData, DocumentStore, FilterOp, Query, Write};

#[derive(Clone)]
pub struct MemberService {
    reconciler: Reconciler,
}

impl MemberService {
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }

    fn store(&self) -> &Arc<dyn DocumentStore> {
        self.reconciler.store()
    }

    pub async fn list(&self, dao: &Address) -> DaoResult<Vec<Value>> {
        self.reconciler.require_dao(dao).await?;
        let query = Query::new(paths::members(dao)).order_by("joinedAt", Direction::Asc);
        Ok(self
            .store()
            .query(&query)
            .await?
            .iter()
            .map(|s| s.with_id("address"))
            .collect())
    }

    pub async fn get(&self, dao: &Address, wallet: &Address) -> DaoResult<Value> {
        self.store()
            .get(&paths::member(dao, wallet))
            .await?
            .map(|s| s.with_id("address"))
            .ok_or_else(|| {
                DaoError::not_found(format!("{} is not a member of {}", wallet.canonical(), dao.canonical()))
            })
    }

    pub async fn join_requests(
        &self,
        dao: &Address,
        status: Option<JoinRequestStatus>,
    ) -> DaoResult<Vec<Value>> {
        let mut query = Query::new(paths::join_requests(dao));
        if let Some(status) = status {
            query = query.filter("status", FilterOp::Eq, status.as_str());
        }
        let query = query.order_by("requestedAt", Direction::Desc);
        Ok(render(self.store().query(&query).await?))
    }

    /// Record a verified `JoinRequested` by the caller's wallet
    pub async fn request_to_join(
        &self,
        dao: &Address,
        tx_hash: &B256,
        caller: &CallerIdentity,
    ) -> DaoResult<Address> {
        let (tx, _) = self
            .reconciler
            .verify_module_event(dao, tx_hash, AbiModule::Member, "JoinRequested")
            .await?;
        let member = tx.event()?.address("member")?;
        ensure_sender_is_actor(&tx.sender(), &member, "member")?;
        ensure_caller_is_actor(caller.wallet.as_ref(), &member, "member")?;

        if self.store().get(&paths::member(dao, &member)).await?.is_some() {
            return Err(Precondition::AlreadyMember {
                dao: dao.canonical(),
                member: member.canonical(),
            }
            .into());
        }
        let request_path = paths::join_request(dao, &member);
        if let Some(existing) = self.store().get(&request_path).await? {
            if existing.get_str("txHash") == Some(tx_hash.to_string().as_str()) {
                return Err(Precondition::TransactionReplayed(tx_hash.to_string()).into());
            }
            if existing.get_str("status") == Some(JoinRequestStatus::Pending.as_str()) {
                return Err(Precondition::JoinRequestPending {
                    dao: dao.canonical(),
                    member: member.canonical(),
                }
                .into());
            }
        }

        self.store()
            .set(
                &request_path,
                DocumentData::new()
                    .set("memberAddress", member.canonical())
                    .set("uid", caller.uid.clone())
                    .set("status", JoinRequestStatus::Pending.as_str())
                    .set("txHash", tx_hash.to_string())
                    .server_timestamp("requestedAt"),
            )
            .await?;

        info!(dao = %dao, actor = %member.canonical(), tx_hash = %tx_hash, uid = %caller.uid, "Join requested");
        Ok(member)
    }

    /// Approve a pending request, adding the member in the same commit
    pub async fn approve(
        &self,
        dao: &Address,
        member: &Address,
        tx_hash: &B256,
        caller: &CallerIdentity,
    ) -> DaoResult<()> {
        let (approver, request) = self
            .verify_handling(dao, member, tx_hash, caller, "JoinRequestApproved", "approver")
            .await?;

        let mut writes = vec![
            Write::Update {
                path: request.path.clone(),
                data: handled(JoinRequestStatus::Approved, &approver, tx_hash),
            },
            Write::Set {
                path: paths::member(dao, member),
                data: DocumentData::new()
                    .set("role", MemberRole::Member.as_str())
                    .set_opt("uid", request.get_str("uid").map(String::from))
                    .set("txHash", tx_hash.to_string())
                    .server_timestamp("joinedAt"),
            },
            Write::Update {
                path: paths::dao(dao),
                data: DocumentData::new().increment("memberCount", 1),
            },
        ];
        if let Some(uid) = request.get_str("uid") {
            writes.push(Write::Merge {
                path: paths::user(uid),
                data: DocumentData::new().array_union("daos", vec![json!(dao.canonical())]),
            });
        }
        self.store().commit(writes).await?;

        info!(dao = %dao, actor = %approver.canonical(), member = %member.canonical(), tx_hash = %tx_hash, "Join request approved");
        Ok(())
    }

    pub async fn reject(
        &self,
        dao: &Address,
        member: &Address,
        tx_hash: &B256,
        caller: &CallerIdentity,
    ) -> DaoResult<()> {
        let (rejecter, request) = self
            .verify_handling(dao, member, tx_hash, caller, "JoinRequestRejected", "rejecter")
            .await?;

        self.store()
            .update(&request.path, handled(JoinRequestStatus::Rejected, &rejecter, tx_hash))
            .await?;

        info!(dao = %dao, actor = %rejecter.canonical(), member = %member.canonical(), tx_hash = %tx_hash, "Join request rejected");
        Ok(())
    }

    /// Shared gates of approve and reject; returns the handler and the request
    async fn verify_handling(
        &self,
        dao: &Address,
        member: &Address,
        tx_hash: &B256,
        caller: &CallerIdentity,
        event_name: &str,
        handler_role: &str,
    ) -> DaoResult<(Address, crate::store::Snapshot)> {
        let (tx, _) = self
            .reconciler
            .verify_module_event(dao, tx_hash, AbiModule::Member, event_name)
            .await?;
        let event = tx.event()?;

        ensure_value_matches("member", &member.canonical(), &event.address("member")?.canonical())?;
        let handler = event.address(handler_role)?;
        ensure_sender_is_actor(&tx.sender(), &handler, handler_role)?;
        ensure_caller_is_actor(caller.wallet.as_ref(), &handler, handler_role)?;

        let request = self
            .store()
            .get(&paths::join_request(dao, member))
            .await?
            .ok_or_else(|| DaoError::not_found(format!("no join request from {}", member.canonical())))?;
        ensure_status(
            &format!("join request from {}", member.canonical()),
            request.get_str("status").unwrap_or_default(),
            JoinRequestStatus::Pending.as_str(),
        )?;

        Ok((handler, request))
    }
}

fn handled(status: JoinRequestStatus, handler: &Address, tx_hash: &B256) -> DocumentData {
    DocumentData::new()
        .set("status", status.as_str())
        .set("handledBy", handler.canonical())
        .set("handledTxHash", tx_hash.to_string())
        .server_timestamp("handledAt")
}
