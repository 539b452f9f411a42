//! Calendar event endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dao_db::{CreatedEntity, ListOptions};
use serde_json::{json, Value};

use super::{dao_address, entity_id};
use crate::dto::{Ack, CreateEventRequest, TxRequest, UpcomingQuery, UpdateEventRequest};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::Caller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:dao/events", get(list_events).post(create_event))
        .route("/:dao/events/upcoming", get(upcoming_events))
        .route(
            "/:dao/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
}

pub async fn create_event(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Ack<CreatedEntity>>)> {
    let dao = dao_address(&dao)?;
    let (tx_hash, event) = req.into_new_event()?;
    let created = state.services.calendar.create(&dao, &tx_hash, &event, &caller).await?;
    Ok((StatusCode::CREATED, Json(Ack::new(created))))
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(options): Query<ListOptions>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.calendar.list(&dao, &options).await?))
}

pub async fn upcoming_events(
    State(state): State<AppState>,
    Path(dao): Path<String>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.calendar.upcoming(&dao, query.limit).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let dao = dao_address(&dao)?;
    Ok(Json(state.services.calendar.get(&dao, &id).await?))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("eventId", &id)?;
    let (tx_hash, update) = req.into_update()?;
    state.services.calendar.update(&dao, &id, &update, &tx_hash).await?;
    Ok(Json(Ack::new(json!({ "eventId": id.to_string() }))))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path((dao, id)): Path<(String, String)>,
    Caller(_caller): Caller,
    ApiJson(req): ApiJson<TxRequest>,
) -> ApiResult<Json<Ack<Value>>> {
    let dao = dao_address(&dao)?;
    let id = entity_id("eventId", &id)?;
    state.services.calendar.delete(&dao, &id, &req.tx_hash()?).await?;
    Ok(Json(Ack::new(json!({ "eventId": id.to_string() }))))
}
