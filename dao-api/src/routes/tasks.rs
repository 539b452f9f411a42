//! Task endpoints
//!
//! Status changes, edits and deletions each require the matching
//! task-management transaction.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use dao_core::parse_tx_hash;
use dao_db::services::TaskList;
use dao_db::{CreatedEntity, ListOptions};
use serde_json::{json, Value};

use super::{dao_address, entity_id};
use crate::dto::{Ack, CreateTaskRequest, TxRequest, UpdateTaskRequest, UpdateTaskStatusRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/tasks", get(list_tasks).post(create_task))
        .route(
            "/:dao/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/:dao/tasks/:id/status", put(update_task_status))
}

pub async fn create_task(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedEntity>>)> {
    let dao = dao_address(&dao)?;
    let (tx_hash, task) = req.into_new_task()?;
    let created = state.services.tasks.create(&dao, &tx_hash, &task, &caller).await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<TaskList>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.tasks.list(&dao, &options).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.tasks.get(&dao, &id).await?))
}

pub async fn update_task_status(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<UpdateTaskStatusRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("taskId", &id)?;
    let tx_hash = parse_tx_hash(&req.tx_hash)?;
    let status = state
        .services
        .tasks
        .update_status(&dao, &id, req.new_status, &tx_hash)
        .await?;
    Ok(Json(Ack::new(json!({ "status": status.as_str() }))))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("taskId", &id)?;
    let (tx_hash, update) = req.into_update()?;
    state.services.tasks.update(&dao, &id, &update, &tx_hash).await?;
    Ok(Json(Ack::new(json!({ "taskId": id.to_string() }))))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("taskId", &id)?;
    state.services.tasks.delete(&dao, &id, &req.tx_hash()?).await?;
    Ok(Json(Ack::new(json!({ "taskId": id.to_string() }))))
}
