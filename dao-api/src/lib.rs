//! DAO API Server
//!
//! REST surface over the verified reconciliation services and the
//! GoCardless payment flow. Reads are public; every write needs a bearer
//! token and every on-chain write carries the hash of the transaction that
//! performed it.
//!
//! ## Endpoints
//!
//! ### DAOs
//! - GET /api/daos - List DAOs (search, sortBy, memberCount, limit, startAfter)
//! - POST /api/daos - Record a DAO from its creation transaction
//! - GET /api/daos/:dao - Get DAO
//! - GET /api/daos/:dao/modules - Get enabled modules
//!
//! ### Proposals and Claims
//! - GET|POST /api/daos/:dao/proposals
//! - GET /api/daos/:dao/proposals/:id
//! - GET /api/daos/:dao/proposals/:id/votes
//! - POST /api/daos/:dao/proposals/:id/vote
//! - the same five routes under /claims
//!
//! ### Tasks
//! - GET|POST /api/daos/:dao/tasks
//! - GET|PUT|DELETE /api/daos/:dao/tasks/:id
//! - PUT /api/daos/:dao/tasks/:id/status
//!
//! ### Calendar
//! - GET|POST /api/daos/:dao/events
//! - GET /api/daos/:dao/events/upcoming
//! - GET|PUT|DELETE /api/daos/:dao/events/:id
//!
//! ### Documents
//! - GET|POST /api/daos/:dao/documents
//! - GET /api/daos/:dao/documents/pending
//! - GET /api/daos/:dao/documents/executed
//! - GET /api/daos/:dao/documents/:id
//! - GET /api/daos/:dao/documents/:id/signatures
//! - POST /api/daos/:dao/documents/:id/sign
//!
//! ### Announcements
//! - GET|POST /api/daos/:dao/announcements
//! - GET|PUT|DELETE /api/daos/:dao/announcements/:id
//!
//! ### Membership
//! - GET /api/daos/:dao/members
//! - GET /api/daos/:dao/members/:wallet
//! - GET|POST /api/daos/:dao/join-requests
//! - POST /api/daos/:dao/join-requests/:member/approve
//! - POST /api/daos/:dao/join-requests/:member/reject
//!
//! ### Treasury
//! - GET /api/daos/:dao/treasury
//! - GET /api/daos/:dao/treasury/transactions (limit, startAfter)
//!
//! ### Users
//! - GET|PUT /api/users/me
//! - GET /api/users/me/daos
//! - GET /api/users/me/notifications
//! - POST /api/users/wallet/connect
//!
//! ### Payments
//! - POST /api/payments/start-redirect-flow
//! - POST /api/payments/confirm-redirect-flow
//! - POST /api/payments/create-payment
//! - POST /api/payments/create-subscription
//! - GET /api/payments/subscriptions
//! - POST /api/payments/subscriptions/:id/cancel
//! - GET /api/payments/mandate
//! - POST /api/webhooks/gocardless

pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use dto::*;
pub use error::*;
pub use middleware::{Caller, IdentityProvider, JwtConfig, JwtIdentityProvider};
pub use routes::create_router;
pub use server::*;
pub use state::*;
