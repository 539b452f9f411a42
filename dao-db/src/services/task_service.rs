//! Task Service
//!
//! Tasks follow a BACKLOG → TODO → IN_PROGRESS → COMPLETED/CANCELLED
//! workflow. Every edit, status change and deletion is backed by its own
//! on-chain event.

use alloy_primitives::{Address, B256, U256};
use dao_chain::{AbiModule, DecodedEvent, VerifiedTx};
use dao_core::consistency::{ensure_sender_is_actor, ensure_text_matches, ensure_value_matches};
use dao_core::{
    CallerIdentity, CanonicalAddress, DaoError, DaoResult, EntityKind, TaskPriority, TaskStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{get_entity, render, unix_field, ListOptions};
use crate::paths;
use crate::reconcile::{CreatedEntity, Reconcilable, Reconciler, TransitionSpec, VerifyAndReconcile};
use crate::store::{Direction, DocumentData, DocumentStore, Query};

const STATUS_CHANGED: TransitionSpec =
    TransitionSpec::new(EntityKind::Task, AbiModule::TaskManagement, "TaskStatusChanged");
const UPDATED: TransitionSpec =
    TransitionSpec::new(EntityKind::Task, AbiModule::TaskManagement, "TaskUpdated");
const DELETED: TransitionSpec =
    TransitionSpec::new(EntityKind::Task, AbiModule::TaskManagement, "TaskDeleted");

/// Validated create-task payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    /// Unix seconds
    pub due_date: Option<u64>,
}

impl Reconcilable for NewTask {
    const KIND: EntityKind = EntityKind::Task;
    const MODULE: AbiModule = AbiModule::TaskManagement;
    const EVENT: &'static str = "TaskCreated";

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
        let due_date = self
            .due_date
            .map(|secs| unix_field("dueDate", secs))
            .transpose()?;
        Ok(DocumentData::new()
            .set("title", self.title.clone())
            .set("description", self.description.clone())
            .set("creator", event.address("creator")?.canonical())
            .set("status", TaskStatus::Backlog.as_str())
            .set("priority", self.priority.as_str())
            .set_opt("dueDate", due_date)
            .server_timestamp("updatedAt"))
    }
}

/// Edit applied by a `TaskUpdated` transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<u64>,
}

/// One page of tasks plus the collection size
#[derive(Debug, Clone, Serialize)]
pub struct TaskList {
    pub tasks: Vec<Value>,
    pub total: usize,
}

#[derive(Clone)]
pub struct TaskService {
    reconciler: Reconciler,
    creates: VerifyAndReconcile<NewTask>,
}

impl TaskService {
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
        request: &NewTask,
        caller: &CallerIdentity,
    ) -> DaoResult<CreatedEntity> {
        self.creates.create(dao, tx_hash, request, caller).await
    }

    /// Newest first, with the total task count
    pub async fn list(&self, dao: &Address, options: &ListOptions) -> DaoResult<TaskList> {
        let query = options.apply(
            Query::new(paths::entities(dao, EntityKind::Task)).order_by("createdAt", Direction::Desc),
        );
        let tasks = render(self.store().query(&query).await?);
        let total = self.store().count(&query).await?;
        Ok(TaskList { tasks, total })
    }

    pub async fn get(&self, dao: &Address, id: &str) -> DaoResult<Value> {
        get_entity(self.store().as_ref(), dao, EntityKind::Task, id).await
    }

    /// Move a task to the status with on-chain index `status_index`
    pub async fn update_status(
        &self,
        dao: &Address,
        id: &U256,
        status_index: u64,
        tx_hash: &B256,
    ) -> DaoResult<TaskStatus> {
        let status = TaskStatus::from_index(status_index)
            .ok_or_else(|| DaoError::validation(format!("unknown task status index {}", status_index)))?;

        let verified = self
            .reconciler
            .verify_transition(&STATUS_CHANGED, dao, id, tx_hash)
            .await?;
        ensure_value_matches("status", &status_index, &verified.event.uint_u64("status")?)?;

        self.store()
            .update(
                &verified.entity.path,
                DocumentData::new()
                    .set("status", status.as_str())
                    .set("statusTxHash", tx_hash.to_string())
                    .server_timestamp("updatedAt"),
            )
            .await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, status = status.as_str(), "Task status changed");
        Ok(status)
    }

    pub async fn update(
        &self,
        dao: &Address,
        id: &U256,
        update: &TaskUpdate,
        tx_hash: &B256,
    ) -> DaoResult<()> {
        let verified = self.reconciler.verify_transition(&UPDATED, dao, id, tx_hash).await?;
        ensure_text_matches("title", &update.title, verified.event.string("title")?)?;

        let due_date = update
            .due_date
            .map(|secs| unix_field("dueDate", secs))
            .transpose()?;
        let data = DocumentData::new()
            .set("title", update.title.clone())
            .set_opt("description", update.description.clone())
            .set_opt("priority", update.priority.map(|p| p.as_str()))
            .set_opt("dueDate", due_date)
            .set("updateTxHash", tx_hash.to_string())
            .server_timestamp("updatedAt");
        self.store().update(&verified.entity.path, data).await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, "Task updated");
        Ok(())
    }

    pub async fn delete(&self, dao: &Address, id: &U256, tx_hash: &B256) -> DaoResult<()> {
        let verified = self.reconciler.verify_transition(&DELETED, dao, id, tx_hash).await?;
        self.store().delete(&verified.entity.path).await?;

        info!(dao = %dao, entity_id = %id, tx_hash = %tx_hash, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::*;

    fn request() -> NewTask {
        NewTask {
            title: "Write docs".to_string(),
            description: "Onboarding guide".to_string(),
            priority: TaskPriority::High,
            due_date: Some(1_767_225_600),
        }
    }

    async fn seeded(h: &Harness, service: &TaskService) {
        let log = h.log(
            AbiModule::TaskManagement,
            "TaskCreated",
            vec![uint(5), text("Write docs"), addr(ALICE)],
        );
        let tx = h.receipt(1, ALICE, true, vec![log]);
        service
            .create(&DAO, &tx, &request(), &caller("alice", ALICE))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_task_defaults() {
        let h = Harness::new().await;
        let service = TaskService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let task = service.get(&DAO, "5").await.unwrap();
        assert_eq!(task["status"], "BACKLOG");
        assert_eq!(task["priority"], "HIGH");
        assert_eq!(task["dueDate"], "2026-01-01T00:00:00.000000Z");
        assert_eq!(task["creator"], ALICE.canonical());
    }

    #[tokio::test]
    async fn test_creator_must_be_sender() {
        let h = Harness::new().await;
        let service = TaskService::new(h.reconciler.clone());
        let log = h.log(
            AbiModule::TaskManagement,
            "TaskCreated",
            vec![uint(5), text("Write docs"), addr(ALICE)],
        );
        let tx = h.receipt(1, BOB, true, vec![log]);

        let err = service
            .create(&DAO, &tx, &request(), &caller("bob", BOB))
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "creator"));
    }

    #[tokio::test]
    async fn test_status_change() {
        let h = Harness::new().await;
        let service = TaskService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let log = h.log(AbiModule::TaskManagement, "TaskStatusChanged", vec![uint(5), small_uint(2)]);
        let tx = h.receipt(2, ALICE, true, vec![log]);

        let mismatch = service.update_status(&DAO, &U256::from(5), 3, &tx).await.unwrap_err();
        assert!(matches!(mismatch, DaoError::FieldMismatch { ref field, .. } if field == "status"));

        let status = service.update_status(&DAO, &U256::from(5), 2, &tx).await.unwrap();
        assert_eq!(status, TaskStatus::InProgress);
        assert_eq!(service.get(&DAO, "5").await.unwrap()["status"], "IN_PROGRESS");

        let invalid = service.update_status(&DAO, &U256::from(5), 9, &tx).await.unwrap_err();
        assert!(matches!(invalid, DaoError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let h = Harness::new().await;
        let service = TaskService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let updated = h.log(AbiModule::TaskManagement, "TaskUpdated", vec![uint(5), text("Write more docs")]);
        let tx = h.receipt(2, ALICE, true, vec![updated]);
        let update = TaskUpdate {
            title: "Write more docs".to_string(),
            priority: Some(TaskPriority::Urgent),
            ..TaskUpdate::default()
        };
        service.update(&DAO, &U256::from(5), &update, &tx).await.unwrap();

        let task = service.get(&DAO, "5").await.unwrap();
        assert_eq!(task["title"], "Write more docs");
        assert_eq!(task["priority"], "URGENT");
        assert_eq!(task["description"], "Onboarding guide");

        let deleted = h.log(AbiModule::TaskManagement, "TaskDeleted", vec![uint(5)]);
        let tx = h.receipt(3, ALICE, true, vec![deleted]);
        service.delete(&DAO, &U256::from(5), &tx).await.unwrap();
        assert!(matches!(service.get(&DAO, "5").await, Err(DaoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_requires_its_event() {
        let h = Harness::new().await;
        let service = TaskService::new(h.reconciler.clone());
        seeded(&h, &service).await;

        let unrelated = h.log(AbiModule::TaskManagement, "TaskUpdated", vec![uint(5), text("x")]);
        let tx = h.receipt(2, ALICE, true, vec![unrelated]);
        let err = service.delete(&DAO, &U256::from(5), &tx).await.unwrap_err();
        assert!(matches!(err, DaoError::EventNotFound { .. }));
        assert!(service.get(&DAO, "5").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_reports_total() {
        let h = Harness::new().await;
        let service = TaskService::new(h.reconciler.clone());
        for (seed, id) in [(1u8, 1u64), (2, 2), (3, 3)] {
            let log = h.log(
                AbiModule::TaskManagement,
                "TaskCreated",
                vec![uint(id), text("Write docs"), addr(ALICE)],
            );
            let tx = h.receipt(seed, ALICE, true, vec![log]);
            service
                .create(&DAO, &tx, &request(), &caller("alice", ALICE))
                .await
                .unwrap();
        }

        let page = service
            .list(
                &DAO,
                &ListOptions {
                    limit: Some(2),
                    ..ListOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.tasks.len(), 2);
        assert_eq!(page.total, 3);
    }
}
