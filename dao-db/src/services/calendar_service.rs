//! Calendar Service

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::consistency::{ensure_sender_is_actor, ensure_text_matches, ensure_value_matches};
use dao_core::{clamp_limit, CallerIdentity, CanonicalAddress, DaoResult, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{get_entity, list_entities, render, unix_field, ListOptions};
use crate::paths;
use crate::reconcile::{CreatedEntity, Reconcilable, Reconciler, TransitionSpec, VerifyAndReconcile};
use crate::store::{now_timestamp, Direction, DocumentData, DocumentStore, FilterOp, Query};

const UPDATED: TransitionSpec = TransitionSpec::new(EntityKind::Event, AbiModule::Calendar, "EventUpdated");
const DELETED: TransitionSpec = TransitionSpec::new(EntityKind::Event, AbiModule::Calendar, "EventDeleted");

/// Default number of upcoming events returned
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

/// Validated create-event payload; times are unix seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: String,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub location: Option<String>,
}

impl Reconcilable for NewCalendarEvent {
    const KIND: EntityKind = EntityKind::Event;
    const MODULE: AbiModule = AbiModule::Calendar;
    const EVENT: &'static str = "EventCreated";

    fn check(&self, tx: &VerifiedTx, event: &DecodedEvent, _caller: &CallerIdentity) -> DaoResult<()> {
        ensure_sender_is_actor(&tx.sender(), &event.address("creator")?, "creator")?;
        ensure_text_matches("title", &self.title, event.string("title")?)?;
        ensure_value_matches("startTime", &U256::from(self.start_time), &event.uint("startTime")?)
    }

    fn document(
        &self,
        _tx: &VerifiedTx,
        event: &DecodedEvent,
        _caller: &CallerIdentity,
    ) -> DaoResult<DocumentData> {
        let end_time = self
            .end_time
            .map(|secs| unix_field("endTime", secs))
            .transpose()?;
        Ok(DocumentData::new()
            .set("title", self.title.clone())
            .set("description", self.description.clone())
            .set("creator", event.address("creator")?.canonical())
            .set("startTime", unix_field("startTime", self.start_time)?)
            .set_opt("endTime", end_time)
            .set_opt("location", self.location.clone()))
    }
}

/// Edit applied by an `EventUpdated` transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub location: Option<String>,
}

#[derive(Clone)]
pub struct CalendarService {
    reconciler: Reconciler,
    creates: VerifyAndReconcile<NewCalendarEvent>,
}

impl CalendarService {
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
        request: &NewCalendarEvent,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        self.creates.create(dao, tx_hash, request, caller).await
    }

    /// Chronological
    pub async fn list(&self, dao: &Address, options: &ListOptions) -> DaoResult<Vec<Value>> {
        list_entities(
            self.store().as_ref(),
            dao,
            EntityKind::Event,
            "startTime",
            Direction::Asc,
            options,
        )
        .await
    }

    /// Events starting after now, soonest first
    pub async fn upcoming(&self, dao: &Address, limit: Option<usize>) -> DaoResult<Vec<Value>> {
        let query = Query::new(paths::entities(dao, EntityKind::Event))
            .filter("startTime", FilterOp::Gt, now_timestamp())
            .order_by("startTime", Direction::Asc)
            .limit(clamp_limit(limit, DEFAULT_UPCOMING_LIMIT));
        Ok(render(self.store().query(&query).await?))
    }

    pub async fn get(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        get_entity(self.store().as_ref(), dao, EntityKind::Event, id).await
    }

    pub async fn update(
        &self,
        dao: &Address,
        id: &U256,
        update: &EventUpdate,
        tx_hash: &B256,
    ) -> DaoResult<()> {
        let verified = self.reconciler.verify_transition(&UPDATED, dao, id, tx_hash).await?;
        ensure_text_matches("title", &update.title, verified.event.string("title")?)?;

        let start_time = update
            .start_time
            .map(|secs| unix_field("startTime", secs))
            .transpose()?;
        let end_time = update
            .end_time
            .map(|secs| unix_field("endTime", secs))
            .transpose()?;
        let data = DocumentData::new()
            .set("title", update.title.clone())
            .set_opt("description", update.description.clone())
            .set_opt("startTime", start_time)
            .set_opt("endTime", end_time)
            .set_opt("location", update.location.clone())
            .set("updateTxHash", tx_hash.to_string())
            .server_timestamp("updatedAt");
        self.store().update(&verified.entity.path, data).await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, "Calendar event updated");
        Ok(())
    }

    pub async fn delete(&self, dao: &Address, id: &U256, tx_hash: &B256) -> DaoResult<()> {
        let verified = self.reconciler.verify_transition(&DELETED, dao, id, tx_hash).await?;
        self.store().delete(&verified.entity.path).await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, "Calendar event deleted");
        Ok(())
    }
}
