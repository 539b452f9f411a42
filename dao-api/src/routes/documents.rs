//! Document signing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dao_db::services::{DocumentFilter, SignOutcome};
use dao_db::{CreatedEntity, ListOptions};
use serde_json::Value;

use super::{dao_address, entity_id};
use crate::dto::{Ack, CreateDocumentRequest, TxRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/documents", get(list_documents).post(create_document))
        .route("/:dao/documents/pending", get(list_pending))
        .route("/:dao/documents/executed", get(list_executed))
        .route("/:dao/documents/:id", get(get_document))
        .route("/:dao/documents/:id/signatures", get(get_signatures))
        .route("/:dao/documents/:id/sign", post(sign_document))
}

pub async fn create_document(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedEntity>>)> {
    let dao = dao_address(&dao)?;
    let (tx_hash, document) = req.into_new_document()?;
    let created = state
        .services
        .documents
        .create(&dao, &tx_hash, &document, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

async fn list_filtered(
    state: &AppState,
    dao: &str,
    filter: DocumentFilter,
    options: &ListOptions,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(dao)?;
    Ok(Json(state.services.documents.list(&dao, filter, options).await?))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    list_filtered(&state, &dao, DocumentFilter::All, &options).await
}

pub async fn list_pending(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    list_filtered(&state, &dao, DocumentFilter::Pending, &options).await
}

pub async fn list_executed(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    list_filtered(&state, &dao, DocumentFilter::Executed, &options).await
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.documents.get(&dao, &id).await?))
}

pub async fn get_signatures(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.documents.signatures(&dao, &id).await?))
}

pub async fn sign_document(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<Json<Ack<SignOutcome>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("documentId", &id)?;
    let outcome = state
        .services
        .documents
        .sign(&dao, &id, &req.tx_hash()?, &caller)
        .await?;
    Ok(Json(Ack::new(outcome)))
}
