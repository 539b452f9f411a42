//! Provider webhook receiver
//!
//! Signature verification is not performed; every referenced resource is
//! re-fetched from the provider before it is mirrored.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use dao_payments::WebhookOutcome;
use serde_json::Value;
use tracing::debug;

use crate::dto::WebhookAck;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/gocardless", post(gocardless_webhook))
}

pub async fn gocardless_webhook(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Response> {
    match state.webhooks.handle(&body).await? {
        WebhookOutcome::Ignored => Ok(StatusCode::NO_CONTENT.into_response()),
        WebhookOutcome::Processed { mirrored } => {
            debug!(mirrored, "Webhook processed");
            Ok(Json(WebhookAck { received: true }).into_response())
        }
    }
}
