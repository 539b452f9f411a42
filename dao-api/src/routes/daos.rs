//! DAO endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dao_db::services::{CreatedDao, ListDaosOptions};
use serde_json::Value;

use super::dao_address;
use crate::dto::{Ack, CreateDaoRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_daos).post(create_dao))
        .route("/:dao", get(get_dao))
        .route("/:dao/modules", get(get_modules))
}

/// Record a DAO from its factory creation transaction
pub async fn create_dao(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateDaoRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedDao>>)> {
    let (tx_hash, new_dao) = req.into_new_dao()?;
    let created = state.services.daos.create(&tx_hash, &new_dao, &caller).await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

pub async fn list_daos(
    State(state): State<AppState>,
    Query(options): Query<ListDaosOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.services.daos.list(&options).await?))
}

pub async fn get_dao(State(state): State<AppState>, Path(dao): Path<String>) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.daos.get(&dao).await?))
}

pub async fn get_modules(State(state): State<AppState>, Path(dao): Path<String>) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.daos.modules(&dao).await?))
}
