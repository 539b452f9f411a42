//! Treasury endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use dao_db::ListOptions;
use serde_json::{json, Value};

use super::dao_address;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/treasury", get(get_treasury))
        .route("/:dao/treasury/transactions", get(list_treasury_transactions))
}

pub async fn get_treasury(State(state): State<AppState>, Path(dao): Path<String>) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.treasury.summary(&dao).await?))
}

pub async fn list_treasury_transactions(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    let transactions = state.services.treasury.transactions(&dao, &options).await?;
    Ok(Json(json!({ "transactions": transactions })))
}
