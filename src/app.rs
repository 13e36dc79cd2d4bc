//! Composition root.
//!
//! Builds the dispatcher and query handlers from configuration and a set of
//! port implementations, and wraps the membership router in the HTTP
//! middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::adapters::http::{membership_router, MembershipAppState};
use crate::adapters::memory::{InMemoryCustomerDirectory, InMemoryGroupMembership};
use crate::application::handlers::membership::{
    CustomerLocks, DownstreamGuard, GetCustomerGroupsHandler, GetMembershipStatusHandler,
    GroupReconciler, IdentityResolver, WebhookDispatcher,
};
use crate::config::{AppConfig, ValidationError};
use crate::ports::{BillingProvider, CustomerDirectory, GroupMembership};

/// Port implementations the service runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn CustomerDirectory>,
    pub groups: Arc<dyn GroupMembership>,
    pub billing: Arc<dyn BillingProvider>,
}

impl Collaborators {
    /// In-memory commerce store with the given billing provider.
    pub fn in_memory(billing: Arc<dyn BillingProvider>) -> Self {
        Self {
            directory: Arc::new(InMemoryCustomerDirectory::new()),
            groups: Arc::new(InMemoryGroupMembership::new()),
            billing,
        }
    }
}

/// Builds the shared HTTP state.
///
/// # Errors
///
/// Returns `ValidationError` if the membership section cannot produce a
/// price map or tier groups.
pub fn build_state(
    config: &AppConfig,
    collaborators: Collaborators,
) -> Result<MembershipAppState, ValidationError> {
    let classifier = config.membership.classifier()?;
    let tier_groups = config.membership.tier_groups()?;
    let guard = DownstreamGuard::new(config.membership.downstream_timeout());

    let resolver = IdentityResolver::new(
        collaborators.directory.clone(),
        collaborators.billing.clone(),
        guard,
    );
    let reconciler = GroupReconciler::new(
        collaborators.groups.clone(),
        collaborators.directory.clone(),
        tier_groups.clone(),
        guard,
    );
    let dispatcher = WebhookDispatcher::new(
        config.payment.signature_verifier(),
        resolver,
        classifier.clone(),
        reconciler,
        Arc::new(CustomerLocks::new()),
    )
    .with_deadline(config.membership.dispatch_deadline());

    Ok(MembershipAppState {
        dispatcher: Arc::new(dispatcher),
        status_handler: Arc::new(GetMembershipStatusHandler::new(
            collaborators.directory.clone(),
            collaborators.billing.clone(),
            classifier,
            guard,
        )),
        groups_handler: Arc::new(GetCustomerGroupsHandler::new(
            collaborators.directory,
            collaborators.groups,
            tier_groups,
            guard,
        )),
    })
}

/// Membership router with request tracing.
///
/// `request_timeout` applies to the read endpoints only.
pub fn build_router(state: MembershipAppState, request_timeout: Duration) -> Router {
    membership_router(request_timeout)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
