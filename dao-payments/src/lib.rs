//! DAO Payments
//!
//! Direct-debit integration: a GoCardless-compatible REST client behind the
//! [`PaymentProvider`] trait, the redirect-flow orchestrator that links a
//! mandate to a user, and webhook ingestion that mirrors provider resources
//! into the document store.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod provider;
pub mod types;
pub mod webhook;

pub use client::GoCardlessClient;
pub use config::{GoCardlessConfig, GoCardlessEnvironment};
pub use error::{PaymentError, PaymentResult};
pub use flow::{
    ConfirmedFlow, CreatedPayment, CreatedSubscription, NewPayment, NewSubscription,
    PaymentFlowOrchestrator, StartFlowRequest, StartedFlow,
};
pub use provider::{MockPaymentProvider, PaymentProvider};
pub use types::{IntervalUnit, ResourceType};
pub use webhook::{strip_reserved, WebhookOutcome, WebhookProcessor};
