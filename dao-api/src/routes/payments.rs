//! GoCardless redirect-flow endpoints
//!
//! Bodies and responses keep the provider's snake_case field names.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dao_payments::{
    ConfirmedFlow, CreatedPayment, CreatedSubscription, NewPayment, NewSubscription,
    StartFlowRequest, StartedFlow,
};
use serde_json::Value;

use crate::dto::ConfirmFlowRequest;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start-redirect-flow", post(start_redirect_flow))
        .route("/confirm-redirect-flow", post(confirm_redirect_flow))
        .route("/create-payment", post(create_payment))
        .route("/create-subscription", post(create_subscription))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscriptions/:id/cancel", post(cancel_subscription))
        .route("/mandate", get(get_mandate))
}

pub async fn start_redirect_flow(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<StartFlowRequest>,
) -> ApiResult<Json<StartedFlow>> {
    Ok(Json(state.payments.start_flow(&caller.uid, &req).await?))
}

pub async fn confirm_redirect_flow(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<ConfirmFlowRequest>,
) -> ApiResult<Json<ConfirmedFlow>> {
    let confirmed = state
        .payments
        .confirm_flow(&caller.uid, &req.redirect_flow_id, &req.session_token)
        .await?;
    Ok(Json(confirmed))
}

pub async fn create_payment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<NewPayment>,
) -> ApiResult<(StatusCode, Json<CreatedPayment>)> {
    let payment = state.payments.create_payment(&caller.uid, &req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<NewSubscription>,
) -> ApiResult<(StatusCode, Json<CreatedSubscription>)> {
    let subscription = state.payments.create_subscription(&caller.uid, &req).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn list_subscriptions(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.payments.list_subscriptions(&caller.uid).await?))
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(caller): Caller,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.payments.cancel_subscription(&caller.uid, &id).await?))
}

pub async fn get_mandate(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Value>> {
    Ok(Json(state.payments.mandate(&caller.uid).await?))
}
