//! HTTP adapter for membership endpoints.
//!
//! - `POST /webhooks/stripe` - Subscription lifecycle webhooks
//! - `GET /membership/customers/:id/status` - Live membership status
//! - `GET /membership/customers/:id/groups` - Tier groups and tier field
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{MembershipApiError, MembershipAppState, WebhookRejection, SIGNATURE_HEADER};
pub use routes::{membership_router, membership_routes, webhook_routes};
