//! Axum router configuration for membership endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{
    get_customer_groups, get_membership_status, handle_stripe_webhook, health, MembershipAppState,
};

/// Read endpoints for a single customer.
///
/// # Routes
/// - `GET /customers/:id/status` - Live tier from the billing provider
/// - `GET /customers/:id/groups` - Tier groups and stored tier field
pub fn membership_routes() -> Router<MembershipAppState> {
    Router::new()
        .route("/customers/:id/status", get(get_membership_status))
        .route("/customers/:id/groups", get(get_customer_groups))
}

/// Webhook endpoints. Authenticated by signature, not by caller identity.
///
/// # Routes
/// - `POST /stripe` - Subscription lifecycle webhooks
pub fn webhook_routes() -> Router<MembershipAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Complete membership router.
///
/// Mounts the read endpoints at `/membership`, webhooks at `/webhooks`, and
/// the liveness probe at `/health`. Only the read endpoints get
/// `read_timeout`; webhook work is bounded by the dispatcher's own deadline
/// so a slow delivery is still acknowledged.
pub fn membership_router(read_timeout: Duration) -> Router<MembershipAppState> {
    Router::new()
        .nest(
            "/membership",
            membership_routes().layer(TimeoutLayer::new(read_timeout)),
        )
        .nest("/webhooks", webhook_routes())
        .route("/health", get(health))
}
