//! Provider resource shapes
//!
//! Field names follow the provider's snake_case wire format. Only the fields
//! the platform reads are modelled; webhook mirroring works on raw JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource collections the webhook mirror understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Payments,
    Subscriptions,
    Mandates,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payments => "payments",
            Self::Subscriptions => "subscriptions",
            Self::Mandates => "mandates",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "payments" => Some(Self::Payments),
            "subscriptions" => Some(Self::Subscriptions),
            "mandates" => Some(Self::Mandates),
            _ => None,
        }
    }

    /// Key under an event's `links` that names the resource id
    pub fn link_key(&self) -> &'static str {
        match self {
            Self::Payments => "payment",
            Self::Subscriptions => "subscription",
            Self::Mandates => "mandate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Weekly,
    Monthly,
    Yearly,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefilledCustomer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectFlowRequest {
    pub description: String,
    pub session_token: String,
    pub success_redirect_url: String,
    pub prefilled_customer: PrefilledCustomer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectFlowLinks {
    #[serde(default)]
    pub mandate: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectFlow {
    pub id: String,
    /// Hosted form address; present until the flow completes
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub links: RedirectFlowLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandateLink {
    pub mandate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Minor currency units
    pub amount: u64,
    pub currency: String,
    pub links: MandateLink,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub amount: u64,
    pub currency: String,
    pub interval_unit: IntervalUnit,
    pub interval: u32,
    pub links: MandateLink,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub interval_unit: Option<IntervalUnit>,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
}
