//! Proposal endpoints

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
use crate::dto::{Ack, CreateProposalRequest, VoteRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/proposals", get(list_proposals).post(create_proposal))
        .route("/:dao/proposals/:id", get(get_proposal))
        .route("/:dao/proposals/:id/votes", get(get_votes))
        .route("/:dao/proposals/:id/vote", post(vote))
}

pub async fn create_proposal(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateProposalRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedEntity>>)> {
    let dao = dao_address(&dao)?;
    let (tx_hash, proposal) = req.into_new_proposal()?;
    let created = state
        .services
        .proposals
        .create(&dao, &tx_hash, &proposal, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

pub async fn list_proposals(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.proposals.list(&dao, &options).await?))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.proposals.get(&dao, &id).await?))
}

pub async fn get_votes(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.proposals.votes(&dao, &id).await?))
}

pub async fn vote(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<VoteRequest>,
) -> ApiResult<Json<Ack<VoteOutcome>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("proposalId", &id)?;
    let tx_hash = parse_tx_hash(&req.tx_hash)?;
    let outcome = state
        .services
        .proposals
        .vote(&dao, &id, &tx_hash, req.vote_type, &caller)
        .await?;
    Ok(Json(Ack::new(outcome)))
}
