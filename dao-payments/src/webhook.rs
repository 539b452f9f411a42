//! Provider webhook ingestion
//!
//! Events only name what changed. Each referenced payment, subscription or
//! mandate is re-fetched from the provider and merged into its top-level
//! mirror collection. Signatures are not checked.

use dao_db::store::DocumentStore;
use dao_db::{paths, DocumentData};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;
use crate::types::ResourceType;

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    id: Option<String>,
    resource_type: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    links: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Body had no `events` array
    Ignored,
    Processed { mirrored: usize },
}

/// Drop keys starting with `__` at every depth
pub fn strip_reserved(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !key.starts_with("__"))
                .map(|(key, inner)| (key, strip_reserved(inner)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_reserved).collect()),
        other => other,
    }
}

pub struct WebhookProcessor {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl WebhookProcessor {
    pub fn new(store: Arc<dyn DocumentStore>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { store, provider }
    }

    /// Process a delivery; the first failing event aborts the rest
    pub async fn handle(&self, body: &Value) -> PaymentResult<WebhookOutcome> {
        let events = match body.get("events").and_then(Value::as_array) {
            Some(events) => events,
            None => {
                debug!("Webhook without events array ignored");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let mut mirrored = 0;
        for raw in events {
            let event: WebhookEvent = match serde_json::from_value(raw.clone()) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed webhook event: {}", e);
                    continue;
                }
            };
            if self.mirror(&event).await? {
                mirrored += 1;
            }
        }

        info!(events = events.len(), mirrored, "Webhook processed");
        Ok(WebhookOutcome::Processed { mirrored })
    }

    async fn mirror(&self, event: &WebhookEvent) -> PaymentResult<bool> {
        let resource_type = match ResourceType::from_str(&event.resource_type) {
            Some(resource_type) => resource_type,
            None => {
                debug!(resource_type = %event.resource_type, "Unhandled webhook resource type");
                return Ok(false);
            }
        };
        let id = match event.links.get(resource_type.link_key()).and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(false),
        };

        let resource = match strip_reserved(self.provider.find_resource(resource_type, id).await?) {
            Value::Object(object) => object,
            other => {
                return Err(PaymentError::InvalidResponse(format!(
                    "{} {} is not an object: {}",
                    resource_type.as_str(),
                    id,
                    other
                )))
            }
        };

        self.store
            .set_merge(
                &paths::provider_resources(resource_type.as_str()).doc(id),
                DocumentData::from_object(resource),
            )
            .await?;

        debug!(
            event_id = event.id.as_deref().unwrap_or("-"),
            action = event.action.as_deref().unwrap_or("-"),
            resource = resource_type.as_str(),
            id = %id,
            "Mirrored provider resource"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockPaymentProvider;
    use dao_db::MemoryDocumentStore;
    use serde_json::json;

    fn processor(provider: Arc<MockPaymentProvider>) -> (Arc<MemoryDocumentStore>, WebhookProcessor) {
        let store = Arc::new(MemoryDocumentStore::new());
        (store.clone(), WebhookProcessor::new(store, provider))
    }

    #[test]
    fn test_strip_reserved_recurses() {
        let cleaned = strip_reserved(json!({
            "id": "PM1",
            "__proto": 1,
            "links": { "mandate": "MD1", "__internal": true },
            "items": [{ "__x": 1, "y": 2 }]
        }));
        assert_eq!(
            cleaned,
            json!({ "id": "PM1", "links": { "mandate": "MD1" }, "items": [{ "y": 2 }] })
        );
    }

    #[tokio::test]
    async fn test_body_without_events_is_ignored() {
        let (store, processor) = processor(Arc::new(MockPaymentProvider::new()));
        let outcome = processor.handle(&json!({ "events": "nope" })).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert_eq!(store.document_count(), 0);
    }

    #[tokio::test]
    async fn test_events_mirror_fetched_resources() {
        let provider = Arc::new(MockPaymentProvider::new());
        provider.insert_resource(
            ResourceType::Payments,
            "PM1",
            json!({ "id": "PM1", "status": "confirmed", "__meta": { "etag": "x" } }),
        );
        provider.insert_resource(ResourceType::Mandates, "MD1", json!({ "id": "MD1", "status": "active" }));
        let (store, processor) = processor(provider);

        store
            .set(
                &paths::provider_resources("payments").doc("PM1"),
                DocumentData::new().set("note", "kept").set("status", "pending_submission"),
            )
            .await
            .unwrap();

        let outcome = processor
            .handle(&json!({
                "events": [
                    { "id": "EV1", "resource_type": "payments", "action": "confirmed", "links": { "payment": "PM1" } },
                    { "id": "EV2", "resource_type": "mandates", "action": "active", "links": { "mandate": "MD1" } },
                    { "id": "EV3", "resource_type": "payouts", "action": "paid", "links": { "payout": "PO1" } },
                    { "id": "EV4", "resource_type": "payments", "action": "created", "links": {} }
                ]
            }))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Processed { mirrored: 2 });

        let payment = store
            .require(&paths::provider_resources("payments").doc("PM1"))
            .await
            .unwrap();
        assert_eq!(payment.get_str("status"), Some("confirmed"));
        assert_eq!(payment.get_str("note"), Some("kept"));
        assert!(payment.get("__meta").is_none());
        assert!(store
            .get(&paths::provider_resources("mandates").doc("MD1"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let (_, processor) = processor(Arc::new(MockPaymentProvider::new()));
        let err = processor
            .handle(&json!({
                "events": [{ "resource_type": "subscriptions", "links": { "subscription": "SB9" } }]
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Rejected { status: 404, .. }));
    }
}
