//! Announcement endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dao_db::{CreatedEntity, ListOptions};
use serde_json::{json, Value};

use super::{dao_address, entity_id};
use crate::dto::{Ack, CreateAnnouncementRequest, TxRequest, UpdateAnnouncementRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:dao/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route(
            "/:dao/announcements/:id",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
}

pub async fn create_announcement(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateAnnouncementRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedEntity>>)> {
    let dao = dao_address(&dao)?;
    let (tx_hash, announcement) = req.into_new_announcement()?;
    let created = state
        .services
        .announcements
        .create(&dao, &tx_hash, &announcement, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

/// Unexpired announcements only
pub async fn list_announcements(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.announcements.list_active(&dao, &options).await?))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.announcements.get(&dao, &id).await?))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<UpdateAnnouncementRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("announcementId", &id)?;
    let (tx_hash, update) = req.into_update()?;
    state
        .services
        .announcements
        .update(&dao, &id, &update, &tx_hash)
        .await?;
    Ok(Json(Ack::new(json!({ "announcementId": id.to_string() }))))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("announcementId", &id)?;
    state.services.announcements.delete(&dao, &id, &req.tx_hash()?).await?;
    Ok(Json(Ack::new(json!({ "announcementId": id.to_string() }))))
}
