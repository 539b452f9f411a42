//! API route handlers

pub mod announcements;
pub mod claims;
pub mod daos;
pub mod documents;
pub mod events;
pub mod health;
pub mod members;
pub mod payments;
pub mod proposals;
pub mod tasks;
pub mod treasury;
pub mod users;
pub mod webhooks;

use alloy_primitives::{Address, U256};
use axum::{middleware, routing::get, Router};
use dao_core::{parse_address, parse_entity_id};

use crate::error::ApiResult;
use crate::middleware::authenticate;
use crate::state::AppState;

/// DAO address from a path segment
pub(crate) fn dao_address(raw: &str) -> ApiResult<Address> {
    Ok(parse_address("daoAddress", raw)?)
}

/// Chain-assigned id from a path segment
pub(crate) fn entity_id(field: &str, raw: &str) -> ApiResult<U256> {
    Ok(parse_entity_id(field, raw)?)
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let dao_routes = Router::new()
        .merge(daos::router())
        .merge(proposals::router())
        .merge(claims::router())
        .merge(tasks::router())
        .merge(events::router())
        .merge(documents::router())
        .merge(announcements::router())
        .merge(members::router())
        .merge(treasury::router());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/daos", dao_routes)
        .nest("/api/users", users::router())
        .nest("/api/payments", payments::router())
        .nest("/api/webhooks", webhooks::router())
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}
