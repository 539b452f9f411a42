//! Payment Provider seam
//!
//! [`PaymentProvider`] is the boundary to the direct-debit provider. The
//! production implementation is [`crate::GoCardlessClient`];
//! [`MockPaymentProvider`] keeps everything in process for tests and local
//! development.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PaymentError, PaymentResult};
use crate::types::{
    Payment, PaymentRequest, RedirectFlow, RedirectFlowLinks, RedirectFlowRequest, ResourceType,
    Subscription, SubscriptionRequest,
};

/// Operations the platform needs from the direct-debit provider
///
/// Every call is attempted once; failures surface to the caller.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_redirect_flow(&self, request: &RedirectFlowRequest) -> PaymentResult<RedirectFlow>;

    /// Run the provider's completion action
    ///
    /// Rejected when the session token does not match or the flow was
    /// already completed.
    async fn complete_redirect_flow(&self, flow_id: &str, session_token: &str) -> PaymentResult<RedirectFlow>;

    async fn create_payment(&self, request: &PaymentRequest) -> PaymentResult<Payment>;

    async fn create_subscription(&self, request: &SubscriptionRequest) -> PaymentResult<Subscription>;

    async fn cancel_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription>;

    /// Fetch a resource as raw JSON
    async fn find_resource(&self, resource_type: ResourceType, id: &str) -> PaymentResult<Value>;
}

struct MockFlow {
    session_token: String,
    links: Option<RedirectFlowLinks>,
}

/// In-process provider
///
/// Mirrors the provider's observable rules: a flow completes once, with the
/// session token it was created with.
#[derive(Default)]
pub struct MockPaymentProvider {
    flows: RwLock<HashMap<String, MockFlow>>,
    resources: RwLock<HashMap<(ResourceType, String), Value>>,
    sequence: AtomicU64,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{:06}", prefix, n)
    }

    /// Register a resource for `find_resource`
    pub fn insert_resource(&self, resource_type: ResourceType, id: impl Into<String>, resource: Value) {
        self.resources.write().insert((resource_type, id.into()), resource);
    }

    pub fn resource(&self, resource_type: ResourceType, id: &str) -> Option<Value> {
        self.resources.read().get(&(resource_type, id.to_string())).cloned()
    }

    fn rejected(status: u16, message: impl Into<String>) -> PaymentError {
        PaymentError::Rejected {
            status,
            message: message.into(),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_redirect_flow(&self, request: &RedirectFlowRequest) -> PaymentResult<RedirectFlow> {
        let id = self.next_id("RE");
        self.flows.write().insert(
            id.clone(),
            MockFlow {
                session_token: request.session_token.clone(),
                links: None,
            },
        );
        Ok(RedirectFlow {
            redirect_url: Some(format!("https://pay-sandbox.example/flow/{}", id)),
            id,
            links: RedirectFlowLinks::default(),
        })
    }

    async fn complete_redirect_flow(&self, flow_id: &str, session_token: &str) -> PaymentResult<RedirectFlow> {
        let mandate = self.next_id("MD");
        let customer = self.next_id("CU");

        let links = {
            let mut flows = self.flows.write();
            let flow = flows
                .get_mut(flow_id)
                .ok_or_else(|| Self::rejected(404, format!("redirect flow {} not found", flow_id)))?;
            if flow.session_token != session_token {
                return Err(Self::rejected(422, "session token does not match the redirect flow"));
            }
            if flow.links.is_some() {
                return Err(Self::rejected(422, "redirect flow already completed"));
            }
            let links = RedirectFlowLinks {
                mandate: Some(mandate.clone()),
                customer: Some(customer),
            };
            flow.links = Some(links.clone());
            links
        };

        self.insert_resource(ResourceType::Mandates, mandate.clone(), json!({ "id": mandate, "status": "pending_submission" }));
        Ok(RedirectFlow {
            id: flow_id.to_string(),
            redirect_url: None,
            links,
        })
    }

    async fn create_payment(&self, request: &PaymentRequest) -> PaymentResult<Payment> {
        let payment = Payment {
            id: self.next_id("PM"),
            status: "pending_submission".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
        };
        self.insert_resource(ResourceType::Payments, payment.id.clone(), json!(payment));
        Ok(payment)
    }

    async fn create_subscription(&self, request: &SubscriptionRequest) -> PaymentResult<Subscription> {
        let subscription = Subscription {
            id: self.next_id("SB"),
            status: "active".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            interval_unit: Some(request.interval_unit),
            interval: Some(request.interval),
            name: request.metadata.get("name").cloned(),
        };
        self.insert_resource(ResourceType::Subscriptions, subscription.id.clone(), json!(subscription));
        Ok(subscription)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription> {
        let mut resources = self.resources.write();
        let stored = resources
            .get_mut(&(ResourceType::Subscriptions, subscription_id.to_string()))
            .ok_or_else(|| Self::rejected(404, format!("subscription {} not found", subscription_id)))?;
        stored["status"] = json!("cancelled");
        serde_json::from_value(stored.clone()).map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }

    async fn find_resource(&self, resource_type: ResourceType, id: &str) -> PaymentResult<Value> {
        self.resource(resource_type, id)
            .ok_or_else(|| Self::rejected(404, format!("{} {} not found", resource_type.as_str(), id)))
    }
}
