//! Redirect-flow orchestration
//!
//! Mandate setup runs `NoFlow -> Started -> Completed`:
//! - `start_flow` asks the provider for a hosted form and records the
//!   session under `users/{uid}/payments/current_flow`
//! - the payer completes the form outside this service
//! - `confirm_flow` runs the provider's completion action and persists the
//!   mandate and customer ids
//!
//! Starting again replaces the recorded session. Payments and subscriptions
//! only need a confirmed mandate and sit outside the state machine.

use dao_core::{Precondition, PaymentFlowStatus};
use dao_db::store::DocumentStore;
use dao_db::{paths, Direction, DocumentData, Query, Write};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;
use crate::types::{
    IntervalUnit, MandateLink, PaymentRequest, PrefilledCustomer, RedirectFlowRequest,
    SubscriptionRequest,
};

const CURRENT_FLOW: &str = "current_flow";
const MANDATE: &str = "mandate";
const FLOW_DESCRIPTION: &str = "Direct Debit Setup";
const PAYMENT_SOURCE: &str = "anise-payment";
const DEFAULT_SUBSCRIPTION_NAME: &str = "anise-subscription";

/// Opaque token binding a flow to the browser session that started it
fn session_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartFlowRequest {
    /// Full name, split into given and family name when the profile has none
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedFlow {
    pub redirect_url: String,
    pub redirect_flow_id: String,
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedFlow {
    pub mandate_id: String,
    pub customer_id: String,
    pub redirect_flow_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    /// Minor currency units
    pub amount: u64,
    pub currency: String,
    /// Defaults to the mandate linked to the user
    pub mandate_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedPayment {
    pub payment_id: String,
    pub status: String,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscription {
    pub amount: u64,
    pub currency: String,
    pub interval_unit: IntervalUnit,
    pub interval: u32,
    pub name: Option<String>,
    pub mandate_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSubscription {
    pub subscription_id: String,
    pub status: String,
    pub amount: u64,
    pub currency: String,
    pub interval_unit: IntervalUnit,
    pub interval: u32,
}

fn normalize_currency(currency: &str) -> PaymentResult<String> {
    let currency = currency.trim().to_uppercase();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(currency)
    } else {
        Err(PaymentError::InvalidRequest(format!(
            "currency must be a three-letter code, got {:?}",
            currency
        )))
    }
}

fn positive_amount(amount: u64) -> PaymentResult<u64> {
    if amount == 0 {
        return Err(PaymentError::InvalidRequest("amount must be positive".to_string()));
    }
    Ok(amount)
}

pub struct PaymentFlowOrchestrator {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn PaymentProvider>,
    success_redirect_url: String,
}

impl PaymentFlowOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn PaymentProvider>,
        success_redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            success_redirect_url: success_redirect_url.into(),
        }
    }

    /// Profile fields win over the request; a bare `name` is split on the first space
    async fn prefill(&self, uid: &str, request: &StartFlowRequest) -> PaymentResult<PrefilledCustomer> {
        let profile = self.store.get(&paths::user(uid)).await?;
        let field = |key: &str| profile.as_ref().and_then(|p| non_empty(p.get_str(key)));

        let (given, family) = match non_empty(request.name.as_deref()) {
            Some(name) => match name.split_once(' ') {
                Some((first, rest)) => (Some(first.to_string()), non_empty(Some(rest))),
                None => (Some(name), None),
            },
            None => (None, None),
        };

        Ok(PrefilledCustomer {
            given_name: field("firstName").or(given),
            family_name: field("lastName").or(family),
            email: field("email").or_else(|| non_empty(request.email.as_deref())),
        })
    }

    pub async fn start_flow(&self, uid: &str, request: &StartFlowRequest) -> PaymentResult<StartedFlow> {
        let session_token = session_token();
        let flow_request = RedirectFlowRequest {
            description: FLOW_DESCRIPTION.to_string(),
            session_token: session_token.clone(),
            success_redirect_url: self.success_redirect_url.clone(),
            prefilled_customer: self.prefill(uid, request).await?,
        };

        let flow = self.provider.create_redirect_flow(&flow_request).await?;
        let redirect_url = flow.redirect_url.ok_or_else(|| {
            PaymentError::InvalidResponse(format!("redirect flow {} has no redirect_url", flow.id))
        })?;

        self.store
            .set(
                &paths::user_payment(uid, CURRENT_FLOW),
                DocumentData::new()
                    .set("redirect_flow_id", flow.id.clone())
                    .set("session_token", session_token.clone())
                    .set("status", PaymentFlowStatus::Started.as_str())
                    .server_timestamp("created_at"),
            )
            .await?;

        info!(uid = %uid, redirect_flow_id = %flow.id, "Payment flow started");
        Ok(StartedFlow {
            redirect_url,
            redirect_flow_id: flow.id,
            session_token,
        })
    }

    /// Complete the recorded flow
    ///
    /// The provider decides whether the token is still good; a repeated
    /// confirmation is rejected there and surfaces as a provider error.
    pub async fn confirm_flow(
        &self,
        uid: &str,
        redirect_flow_id: &str,
        session_token: &str,
    ) -> PaymentResult<ConfirmedFlow> {
        let flow_path = paths::user_payment(uid, CURRENT_FLOW);
        let current = self
            .store
            .get(&flow_path)
            .await?
            .ok_or(Precondition::NoPaymentFlow)?;
        if current.get_str("redirect_flow_id") != Some(redirect_flow_id) {
            return Err(Precondition::FlowMismatch(redirect_flow_id.to_string()).into());
        }

        let flow = self
            .provider
            .complete_redirect_flow(redirect_flow_id, session_token)
            .await?;
        let (mandate_id, customer_id) = match (flow.links.mandate, flow.links.customer) {
            (Some(mandate), Some(customer)) => (mandate, customer),
            _ => {
                return Err(PaymentError::InvalidResponse(format!(
                    "completed flow {} is missing mandate or customer links",
                    redirect_flow_id
                )))
            }
        };
        debug!(uid = %uid, redirect_flow_id = %redirect_flow_id, "Provider completed redirect flow");

        self.store
            .commit(vec![
                Write::Set {
                    path: paths::user_payment(uid, MANDATE),
                    data: DocumentData::new()
                        .set("mandate_id", mandate_id.clone())
                        .set("customer_id", customer_id.clone())
                        .set("status", "active")
                        .server_timestamp("created_at"),
                },
                Write::Merge {
                    path: paths::user(uid),
                    data: DocumentData::new()
                        .set("gocardless.customer_id", customer_id.clone())
                        .set("gocardless.mandate_id", mandate_id.clone())
                        .server_timestamp("gocardless.linked_at"),
                },
                Write::Update {
                    path: flow_path,
                    data: DocumentData::new()
                        .set("mandate_id", mandate_id.clone())
                        .set("status", PaymentFlowStatus::Completed.as_str())
                        .server_timestamp("completed_at"),
                },
            ])
            .await?;

        info!(uid = %uid, mandate_id = %mandate_id, "Mandate linked");
        Ok(ConfirmedFlow {
            mandate_id,
            customer_id,
            redirect_flow_id: redirect_flow_id.to_string(),
        })
    }

    async fn resolve_mandate(&self, uid: &str, explicit: Option<&str>) -> PaymentResult<String> {
        if let Some(mandate) = non_empty(explicit) {
            return Ok(mandate);
        }
        let linked = self
            .store
            .get(&paths::user(uid))
            .await?
            .and_then(|user| non_empty(user.get_str("gocardless.mandate_id")));
        linked.ok_or_else(|| {
            PaymentError::InvalidRequest("no mandate given and none linked to this account".to_string())
        })
    }

    pub async fn create_payment(&self, uid: &str, request: &NewPayment) -> PaymentResult<CreatedPayment> {
        let amount = positive_amount(request.amount)?;
        let currency = normalize_currency(&request.currency)?;
        let mandate = self.resolve_mandate(uid, request.mandate_id.as_deref()).await?;

        let payment = self
            .provider
            .create_payment(&PaymentRequest {
                amount,
                currency,
                links: MandateLink { mandate },
                metadata: BTreeMap::from([("source".to_string(), PAYMENT_SOURCE.to_string())]),
            })
            .await?;

        info!(uid = %uid, payment_id = %payment.id, amount = payment.amount, "Payment created");
        Ok(CreatedPayment {
            payment_id: payment.id,
            status: payment.status,
            amount: payment.amount,
            currency: payment.currency,
        })
    }

    pub async fn create_subscription(
        &self,
        uid: &str,
        request: &NewSubscription,
    ) -> PaymentResult<CreatedSubscription> {
        let amount = positive_amount(request.amount)?;
        let currency = normalize_currency(&request.currency)?;
        if request.interval == 0 {
            return Err(PaymentError::InvalidRequest("interval must be positive".to_string()));
        }
        let mandate = self.resolve_mandate(uid, request.mandate_id.as_deref()).await?;
        let name = non_empty(request.name.as_deref()).unwrap_or_else(|| DEFAULT_SUBSCRIPTION_NAME.to_string());

        let subscription = self
            .provider
            .create_subscription(&SubscriptionRequest {
                amount,
                currency,
                interval_unit: request.interval_unit,
                interval: request.interval,
                links: MandateLink { mandate },
                metadata: BTreeMap::from([("name".to_string(), name.clone())]),
            })
            .await?;

        self.store
            .set(
                &paths::user_subscriptions(uid).doc(subscription.id.clone()),
                DocumentData::new()
                    .set("subscription_id", subscription.id.clone())
                    .set("amount", subscription.amount)
                    .set("currency", subscription.currency.clone())
                    .set("status", subscription.status.clone())
                    .set("interval_unit", request.interval_unit.as_str())
                    .set("interval", request.interval)
                    .set("name", name)
                    .server_timestamp("created_at"),
            )
            .await?;

        info!(uid = %uid, subscription_id = %subscription.id, "Subscription created");
        Ok(CreatedSubscription {
            subscription_id: subscription.id,
            status: subscription.status,
            amount: subscription.amount,
            currency: subscription.currency,
            interval_unit: request.interval_unit,
            interval: request.interval,
        })
    }

    /// Newest first
    pub async fn list_subscriptions(&self, uid: &str) -> PaymentResult<Vec<Value>> {
        let query = Query::new(paths::user_subscriptions(uid)).order_by("created_at", Direction::Desc);
        Ok(self
            .store
            .query(&query)
            .await?
            .iter()
            .map(|s| s.with_id("id"))
            .collect())
    }

    pub async fn cancel_subscription(&self, uid: &str, subscription_id: &str) -> PaymentResult<Value> {
        let path = paths::user_subscriptions(uid).doc(subscription_id);
        if self.store.get(&path).await?.is_none() {
            return Err(PaymentError::NotFound(format!("subscription {}", subscription_id)));
        }

        let cancelled = self.provider.cancel_subscription(subscription_id).await?;
        self.store
            .update(
                &path,
                DocumentData::new()
                    .set("status", cancelled.status.clone())
                    .server_timestamp("cancelled_at"),
            )
            .await?;

        info!(uid = %uid, subscription_id = %subscription_id, "Subscription cancelled");
        Ok(json!({ "subscription_id": cancelled.id, "status": cancelled.status }))
    }

    pub async fn mandate(&self, uid: &str) -> PaymentResult<Value> {
        self.store
            .get(&paths::user_payment(uid, MANDATE))
            .await?
            .map(|s| s.with_id("id"))
            .ok_or_else(|| PaymentError::NotFound(format!("no mandate linked for {}", uid)))
    }
}
