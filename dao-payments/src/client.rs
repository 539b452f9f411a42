//! GoCardless REST client
//!
//! Request and response bodies are wrapped in an envelope named after the
//! resource collection (`{"payments": {...}}`); action endpoints take
//! `{"data": {...}}`. Errors come back as `{"error": {"message": ...}}`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::GoCardlessConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;
use crate::types::{
    Payment, PaymentRequest, RedirectFlow, RedirectFlowRequest, ResourceType, Subscription,
    SubscriptionRequest,
};

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<ProviderFieldError>,
}

#[derive(Debug, Deserialize)]
struct ProviderFieldError {
    #[serde(default)]
    field: Option<String>,
    message: String,
}

impl ProviderErrorBody {
    fn describe(self) -> String {
        if self.errors.is_empty() {
            return self.message;
        }
        let details: Vec<String> = self
            .errors
            .into_iter()
            .map(|e| match e.field {
                Some(field) => format!("{} {}", field, e.message),
                None => e.message,
            })
            .collect();
        format!("{} ({})", self.message, details.join("; "))
    }
}

/// Provider ids are opaque alphanumerics; anything else never reaches a URL
fn check_id(id: &str) -> PaymentResult<&str> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(id)
    } else {
        Err(PaymentError::InvalidRequest(format!("invalid provider id: {:?}", id)))
    }
}

pub struct GoCardlessClient {
    client: Client,
    config: GoCardlessConfig,
}

impl GoCardlessClient {
    pub fn new(config: GoCardlessConfig) -> PaymentResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GoCardlessConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base(), path);
        debug!("GoCardless request: {} {}", method, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.config.access_token)
            .header("GoCardless-Version", &self.config.api_version)
            .header("Accept", "application/json")
    }

    /// POST that creates a resource, with a fresh idempotency key
    fn create(&self, collection: &str, body: &impl Serialize) -> RequestBuilder {
        self.request(Method::POST, &format!("/{}", collection))
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .json(&json!({ collection: body }))
    }

    fn action(&self, collection: &str, id: &str, action: &str, data: Value) -> PaymentResult<RequestBuilder> {
        let path = format!("/{}/{}/actions/{}", collection, check_id(id)?, action);
        Ok(self.request(Method::POST, &path).json(&json!({ "data": data })))
    }

    /// Send and unwrap the `envelope` key of the response
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, envelope: &str) -> PaymentResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.describe())
                .unwrap_or(body);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let mut parsed: Value =
            serde_json::from_str(&body).map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
        let inner = parsed
            .get_mut(envelope)
            .map(Value::take)
            .ok_or_else(|| PaymentError::InvalidResponse(format!("missing `{}` envelope", envelope)))?;
        serde_json::from_value(inner).map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for GoCardlessClient {
    async fn create_redirect_flow(&self, request: &RedirectFlowRequest) -> PaymentResult<RedirectFlow> {
        self.send(self.create("redirect_flows", request), "redirect_flows").await
    }

    async fn complete_redirect_flow(&self, flow_id: &str, session_token: &str) -> PaymentResult<RedirectFlow> {
        let builder = self.action(
            "redirect_flows",
            flow_id,
            "complete",
            json!({ "session_token": session_token }),
        )?;
        self.send(builder, "redirect_flows").await
    }

    async fn create_payment(&self, request: &PaymentRequest) -> PaymentResult<Payment> {
        self.send(self.create("payments", request), "payments").await
    }

    async fn create_subscription(&self, request: &SubscriptionRequest) -> PaymentResult<Subscription> {
        self.send(self.create("subscriptions", request), "subscriptions").await
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription> {
        let builder = self.action("subscriptions", subscription_id, "cancel", json!({}))?;
        self.send(builder, "subscriptions").await
    }

    async fn find_resource(&self, resource_type: ResourceType, id: &str) -> PaymentResult<Value> {
        let collection = resource_type.as_str();
        let builder = self.request(Method::GET, &format!("/{}/{}", collection, check_id(id)?));
        self.send(builder, collection).await
    }
}
