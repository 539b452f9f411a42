//! Membership and join-request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dao_core::{parse_address, CanonicalAddress, DaoError, JoinRequestStatus};
use serde_json::{json, Value};

use super::dao_address;
use crate::dto::{Ack, JoinRequestsQuery, TxRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/members", get(list_members))
        .route("/:dao/members/:wallet", get(get_member))
        .route("/:dao/join-requests", get(list_join_requests).post(request_to_join))
        .route("/:dao/join-requests/:member/approve", post(approve_join_request))
        .route("/:dao/join-requests/:member/reject", post(reject_join_request))
}

pub async fn list_members(State(state): State<AppState>, Path(dao): Path<String>) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.members.list(&dao).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    Path((dao, wallet)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    let wallet = parse_address("wallet", &wallet)?;
    Ok(Json(state.services.members.get(&dao, &wallet).await?))
}

pub async fn list_join_requests(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(query): Query<JoinRequestsQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            JoinRequestStatus::from_str(raw)
                .ok_or_else(|| DaoError::validation(format!("unknown join request status: {}", raw)))?,
        ),
    };
    Ok(Json(state.services.members.join_requests(&dao, status).await?))
}

pub async fn request_to_join(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<(StatusCode, Json<Ack<Value>>)> {
    let dao = dao_address(&dao)?;
    let member = state
        .services
        .members
        .request_to_join(&dao, &req.tx_hash()?, &caller)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Ack::new(json!({ "member": member.canonical(), "status": JoinRequestStatus::Pending.as_str() }))),
    ))
}

pub async fn approve_join_request(
    State(state): State<AppState>,
    Path((dao, member)): Path<(String, String)>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let member = parse_address("member", &member)?;
    state
        .services
        .members
        .approve(&dao, &member, &req.tx_hash()?, &caller)
        .await?;
    Ok(Json(Ack::new(json!({ "member": member.canonical(), "status": JoinRequestStatus::Approved.as_str() }))))
}

pub async fn reject_join_request(
    State(state): State<AppState>,
    Path((dao, member)): Path<(String, String)>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let member = parse_address("member", &member)?;
    state
        .services
        .members
        .reject(&dao, &member, &req.tx_hash()?, &caller)
        .await?;
    Ok(Json(Ack::new(json!({ "member": member.canonical(), "status": JoinRequestStatus::Rejected.as_str() }))))
}
