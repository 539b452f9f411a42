//! Signed-in user endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use dao_core::CanonicalAddress;
use dao_db::services::{ProfileUpdate, UserDaoPage, UserDaosOptions};
use serde_json::{json, Value};

use crate::dto::{Ack, ConnectWalletRequest, WalletResponse};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_profile).put(update_profile))
        .route("/me/daos", get(get_user_daos))
        .route("/me/notifications", get(get_notifications))
        .route("/wallet/connect", post(connect_wallet))
}

pub async fn get_profile(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Value>> {
    Ok(Json(state.services.users.profile(&caller.uid).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<Ack<Value>>> {
    let profile = state.services.users.update_profile(&caller.uid, update).await?;
    Ok(Json(Ack::new(json!({ "profile": profile }))))
}

pub async fn get_notifications(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<Value>> {
    let notifications = state.services.users.notifications(&caller.uid).await?;
    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn get_user_daos(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(options): Query<UserDaosOptions>,
) -> ApiResult<Json<UserDaoPage>> {
    Ok(Json(state.services.users.user_daos(&caller.uid, &options).await?))
}

pub async fn connect_wallet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<ConnectWalletRequest>,
) -> ApiResult<Json<Ack<WalletResponse>>> {
    let address = state
        .services
        .users
        .connect_wallet(&caller.uid, &req.address, &req.signature)
        .await?;
    Ok(Json(Ack::new(WalletResponse {
        address: address.canonical(),
    })))
}
