//! Claim endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dao_core::parse_tx_hash;
use dao_db::{CreatedEntity, ListOptions, VoteOutcome};
use serde_json::Value;

use super::{dao_address, entity_id};
use crate::dto::{Ack, CreateClaimRequest, VoteRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/claims", get(list_claims).post(create_claim))
        .route("/:dao/claims/:id", get(get_claim))
        .route("/:dao/claims/:id/votes", get(get_votes))
        .route("/:dao/claims/:id/vote", post(vote))
}

pub async fn create_claim(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateClaimRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedEntity>>)> {
    let dao = dao_address(&dao)?;
    let (tx_hash, claim) = req.into_new_claim()?;
    let created = state
        .services
        .claims
        .create(&dao, &tx_hash, &claim, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

pub async fn list_claims(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.claims.list(&dao, &options).await?))
}

pub async fn get_claim(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.claims.get(&dao, &id).await?))
}

pub async fn get_votes(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.claims.votes(&dao, &id).await?))
}

pub async fn vote(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<Ack<VoteOutcome>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("claimId", &id)?;
    let tx_hash = parse_tx_hash(&req.tx_hash)?;
    let outcome = state
        .services
        .claims
        .vote(&dao, &id, &tx_hash, req.vote_type, &caller)
        .await?;
    Ok(Json(Ack::new(outcome)))
}
