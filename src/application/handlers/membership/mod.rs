//! Membership handlers.
//!
//! Command and query handlers for subscription-entitlement reconciliation:
//!
//! ## Commands
//! - Dispatching subscription lifecycle webhooks (`WebhookDispatcher`)
//!
//! ## Queries
//! - Live membership status from the billing provider
//! - Tier groups a customer belongs to
//!
//! ## Building blocks
//! - `IdentityResolver` - billing customer to internal customer
//! - `GroupReconciler` - converges groups and the tier field
//! - `CustomerLocks` - per-customer serialization
//! - `DownstreamGuard` - timeouts on collaborator calls

mod customer_locks;
mod dispatch_webhook;
mod downstream;
mod get_customer_groups;
mod get_membership_status;
mod reconcile_groups;
mod resolve_identity;

// Commands
pub use dispatch_webhook::{
    DispatchWebhookCommand, DispatchWebhookResult, WebhookDispatcher, DEFAULT_DISPATCH_DEADLINE,
};

// Queries
pub use get_customer_groups::{CustomerGroupsView, GetCustomerGroupsHandler, GetCustomerGroupsQuery};
pub use get_membership_status::{
    GetMembershipStatusHandler, GetMembershipStatusQuery, MembershipStatusView,
};

// Building blocks
pub use customer_locks::{BillingCustomerLocks, CustomerLockGuard, CustomerLocks, KeyedLocks};
pub use downstream::{DownstreamFailure, DownstreamGuard, FailureKind, DEFAULT_DOWNSTREAM_TIMEOUT};
pub use reconcile_groups::{GroupReconciler, ReconcileError, ReconcileReport, ReconcileStep};
pub use resolve_identity::IdentityResolver;
