//! WebhookDispatcher - Command handler for subscription lifecycle webhooks.
//!
//! Owns the acknowledgement policy: only signature failures are surfaced to
//! the caller. Everything after verification is logged and absorbed so the
//! billing provider never retries a delivery that was authentic.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::domain::foundation::CustomerId;
use crate::domain::membership::{
    MembershipTier, SignatureError, SignatureVerifier, StripeEvent, SubscriptionSnapshot,
    TierClassifier, Verification,
};

use super::customer_locks::{BillingCustomerLocks, CustomerLocks};
use super::reconcile_groups::GroupReconciler;
use super::resolve_identity::IdentityResolver;

/// Upper bound on the work done for one authentic delivery.
pub const DEFAULT_DISPATCH_DEADLINE: Duration = Duration::from_secs(60);

/// Command to handle an inbound webhook delivery.
#[derive(Debug, Clone)]
pub struct DispatchWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

/// How an authentic delivery was handled. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchWebhookResult {
    /// Unsigned probe accepted in test mode.
    TestPing,
    /// Event type not monitored.
    Ignored { event_id: String, event_type: String },
    /// No internal customer matched the billing customer.
    Unmatched {
        event_id: String,
        billing_customer_id: String,
    },
    /// Customer reconciled to the classified tier.
    Reconciled {
        event_id: String,
        customer_id: CustomerId,
        tier: MembershipTier,
    },
    /// A step failed after verification; the failure was logged.
    Absorbed { event_id: String, step: String },
}

/// Handler for subscription webhooks.
///
/// Pipeline: verify → filter → decode → resolve → classify → reconcile.
///
/// Deliveries for one billing customer are processed in arrival order: the
/// billing customer's lock is taken before resolution and held until
/// reconciliation ends.
pub struct WebhookDispatcher {
    verifier: SignatureVerifier,
    resolver: IdentityResolver,
    classifier: TierClassifier,
    reconciler: GroupReconciler,
    locks: Arc<CustomerLocks>,
    billing_locks: BillingCustomerLocks,
    deadline: Duration,
}

impl WebhookDispatcher {
    pub fn new(
        verifier: SignatureVerifier,
        resolver: IdentityResolver,
        classifier: TierClassifier,
        reconciler: GroupReconciler,
        locks: Arc<CustomerLocks>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            classifier,
            reconciler,
            locks,
            billing_locks: BillingCustomerLocks::new(),
            deadline: DEFAULT_DISPATCH_DEADLINE,
        }
    }

    /// Bounds everything after decoding: lock waits, resolution and
    /// reconciliation.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Handles one delivery.
    ///
    /// # Errors
    ///
    /// Only `SignatureError`. No collaborator is called when verification
    /// fails.
    pub async fn handle(
        &self,
        cmd: DispatchWebhookCommand,
    ) -> Result<DispatchWebhookResult, SignatureError> {
        let work_id = Uuid::new_v4();
        self.dispatch(cmd)
            .instrument(tracing::info_span!("stripe_webhook", %work_id))
            .await
    }

    async fn dispatch(
        &self,
        cmd: DispatchWebhookCommand,
    ) -> Result<DispatchWebhookResult, SignatureError> {
        // 1. Authenticate
        let verification = self
            .verifier
            .authenticate(&cmd.payload, cmd.signature.as_deref())
            .map_err(|e| {
                tracing::warn!(reason = e.reason(), error = %e, "Rejected webhook");
                e
            })?;

        let event = match verification {
            Verification::TestPing => {
                tracing::info!("Accepted unsigned test ping");
                return Ok(DispatchWebhookResult::TestPing);
            }
            Verification::Verified(event) => event,
        };

        // 2. Filter
        let event_type = event.parsed_type();
        if !event_type.is_monitored() {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Ignoring unmonitored event type"
            );
            return Ok(DispatchWebhookResult::Ignored {
                event_id: event.id,
                event_type: event.event_type,
            });
        }

        // 3. Decode
        let snapshot = match SubscriptionSnapshot::from_stripe_object(&event.data.object) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    step = "decode_subscription",
                    error = %e,
                    "Subscription payload could not be decoded"
                );
                return Ok(absorbed(&event, "decode_subscription"));
            }
        };

        // 4-6. Resolve, classify and reconcile within the deadline
        match tokio::time::timeout(self.deadline, self.apply(&event, &snapshot)).await {
            Ok(result) => Ok(result),
            Err(_) => {
                tracing::error!(
                    event_id = %event.id,
                    billing_customer_id = %snapshot.billing_customer_id,
                    step = "deadline",
                    deadline_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX),
                    "Webhook processing exceeded its deadline"
                );
                Ok(absorbed(&event, "deadline"))
            }
        }
    }

    async fn apply(&self, event: &StripeEvent, snapshot: &SubscriptionSnapshot) -> DispatchWebhookResult {
        let event_type = event.parsed_type();
        let _billing_lock = self.billing_locks.acquire(&snapshot.billing_customer_id).await;

        let identity = match self.resolver.resolve(snapshot).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::warn!(
                    event_id = %event.id,
                    billing_customer_id = %snapshot.billing_customer_id,
                    has_email = snapshot.customer_email.is_some(),
                    "No customer matches billing customer"
                );
                return DispatchWebhookResult::Unmatched {
                    event_id: event.id.clone(),
                    billing_customer_id: snapshot.billing_customer_id.clone(),
                };
            }
            Err(failure) => {
                tracing::error!(
                    event_id = %event.id,
                    billing_customer_id = %snapshot.billing_customer_id,
                    step = failure.step,
                    error = %failure,
                    "Identity resolution failed"
                );
                return absorbed(event, failure.step);
            }
        };

        let _lock = self.locks.acquire(&identity.customer_id).await;
        let tier = self.classifier.classify(event_type, snapshot);

        match self.reconciler.reconcile(&identity.customer_id, tier).await {
            Ok(report) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = event_type.as_str(),
                    customer_id = %identity.customer_id,
                    resolved_via = identity.resolved_via.as_str(),
                    status = snapshot.status.as_str(),
                    tier = %tier,
                    removed = report.removed.len(),
                    "Membership reconciled"
                );
                DispatchWebhookResult::Reconciled {
                    event_id: event.id.clone(),
                    customer_id: identity.customer_id,
                    tier,
                }
            }
            Err(err) => {
                let completed: Vec<String> = err.completed.iter().map(ToString::to_string).collect();
                tracing::error!(
                    event_id = %event.id,
                    customer_id = %err.customer_id,
                    tier = %err.target,
                    step = err.source.step,
                    failed_step = %err.failed_step,
                    completed = ?completed,
                    error = %err.source,
                    "Reconciliation failed part-way"
                );
                absorbed(event, err.source.step)
            }
        }
    }
}

fn absorbed(event: &StripeEvent, step: &str) -> DispatchWebhookResult {
    DispatchWebhookResult::Absorbed {
        event_id: event.id.clone(),
        step: step.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCustomerDirectory, InMemoryGroupMembership};
    use crate::adapters::stripe::MockBillingProvider;
    use crate::application::handlers::membership::DownstreamGuard;
    use crate::domain::foundation::{DomainError, GroupId};
    use crate::domain::membership::{
        signature_header, PriceTierMap, TierGroups, UnmappedPricePolicy,
    };
    use crate::ports::CustomerRecord;
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;

    const SECRET: &str = "whsec_dispatch_test";
    const BASIC_GROUP: &str = "10";
    const PREMIUM_GROUP: &str = "20";

    // ════════════════════════════════════════════════════════════════════════════
    // Fixture
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        directory: InMemoryCustomerDirectory,
        groups: InMemoryGroupMembership,
        billing: MockBillingProvider,
        dispatcher: WebhookDispatcher,
    }

    fn fixture_with(allow_test_ping: bool, timeout: Duration) -> Fixture {
        let directory = InMemoryCustomerDirectory::new();
        let groups = InMemoryGroupMembership::new();
        let billing = MockBillingProvider::new();
        let guard = DownstreamGuard::new(timeout);

        let verifier = SignatureVerifier::new(SecretString::new(SECRET.to_string()), Duration::from_secs(300))
            .allow_unsigned_test_ping(allow_test_ping);
        let resolver = IdentityResolver::new(
            Arc::new(directory.clone()),
            Arc::new(billing.clone()),
            guard,
        );
        let classifier = TierClassifier::new(
            PriceTierMap::new(["price_basic"], ["price_premium"], UnmappedPricePolicy::NoEntitlement)
                .unwrap(),
        );
        let reconciler = GroupReconciler::new(
            Arc::new(groups.clone()),
            Arc::new(directory.clone()),
            TierGroups::new(group(BASIC_GROUP), group(PREMIUM_GROUP)).unwrap(),
            guard,
        );

        Fixture {
            directory,
            groups,
            billing,
            dispatcher: WebhookDispatcher::new(
                verifier,
                resolver,
                classifier,
                reconciler,
                Arc::new(CustomerLocks::new()),
            ),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(false, Duration::from_millis(200))
    }

    fn with_deadline(f: Fixture, deadline: Duration) -> Fixture {
        Fixture {
            dispatcher: f.dispatcher.with_deadline(deadline),
            ..f
        }
    }

    fn group(id: &str) -> GroupId {
        GroupId::new(id).unwrap()
    }

    fn customer() -> CustomerId {
        CustomerId::new("7").unwrap()
    }

    fn linked_customer(f: &Fixture) {
        f.directory.insert(CustomerRecord {
            id: customer(),
            email: "member@example.com".to_string(),
            billing_customer_id: Some("cus_1".to_string()),
            tier: MembershipTier::None,
        });
    }

    fn event_body(event_type: &str, status: &str, price: &str) -> Vec<u8> {
        json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_704_067_200,
            "livemode": false,
            "data": {
                "object": {
                    "id": "sub_1",
                    "object": "subscription",
                    "customer": "cus_1",
                    "status": status,
                    "items": { "data": [ { "price": { "id": price } } ] }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn signed(payload: Vec<u8>) -> DispatchWebhookCommand {
        let header = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload);
        DispatchWebhookCommand {
            payload,
            signature: Some(header),
        }
    }

    fn collaborator_calls(f: &Fixture) -> usize {
        f.directory.calls().len() + f.groups.calls().len() + f.billing.calls().len()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Lifecycle scenarios
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_active_basic_grants_basic() {
        let f = fixture();
        linked_customer(&f);

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert_eq!(
            result,
            DispatchWebhookResult::Reconciled {
                event_id: "evt_1".to_string(),
                customer_id: customer(),
                tier: MembershipTier::Basic,
            }
        );
        assert_eq!(f.groups.memberships(&customer()), vec![group(BASIC_GROUP)]);
        assert_eq!(f.directory.customer(&customer()).unwrap().tier, MembershipTier::Basic);
    }

    #[tokio::test]
    async fn deleted_subscription_clears_membership() {
        let f = fixture();
        linked_customer(&f);
        f.groups.seed(group(PREMIUM_GROUP), customer());

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.deleted", "canceled", "price_premium")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Reconciled { tier: MembershipTier::None, .. }));
        assert!(f.groups.memberships(&customer()).is_empty());
        assert_eq!(f.directory.customer(&customer()).unwrap().tier, MembershipTier::None);
    }

    #[tokio::test]
    async fn past_due_update_downgrades_to_none() {
        let f = fixture();
        linked_customer(&f);
        f.groups.seed(group(BASIC_GROUP), customer());

        f.dispatcher
            .handle(signed(event_body("customer.subscription.updated", "past_due", "price_basic")))
            .await
            .unwrap();

        assert!(f.groups.memberships(&customer()).is_empty());
    }

    #[tokio::test]
    async fn redelivery_is_idempotent() {
        let f = fixture();
        linked_customer(&f);
        let body = event_body("customer.subscription.updated", "active", "price_premium");

        let first = f.dispatcher.handle(signed(body.clone())).await.unwrap();
        let second = f.dispatcher.handle(signed(body)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.groups.memberships(&customer()), vec![group(PREMIUM_GROUP)]);
        assert_eq!(f.directory.customer(&customer()).unwrap().tier, MembershipTier::Premium);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Authentication
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn tampered_payload_is_rejected_before_any_collaborator_call() {
        let f = fixture();
        linked_customer(&f);
        let mut cmd = signed(event_body("customer.subscription.created", "active", "price_basic"));
        cmd.payload = event_body("customer.subscription.created", "active", "price_premium");

        let err = f.dispatcher.handle(cmd).await.unwrap_err();

        assert_eq!(err, SignatureError::NoMatchingSignature);
        assert_eq!(collaborator_calls(&f), 0);
    }

    #[tokio::test]
    async fn unsigned_request_rejected_when_test_ping_disabled() {
        let f = fixture();

        let err = f
            .dispatcher
            .handle(DispatchWebhookCommand {
                payload: b"{}".to_vec(),
                signature: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err, SignatureError::MissingHeader);
    }

    #[tokio::test]
    async fn unsigned_test_ping_touches_nothing() {
        let f = fixture_with(true, Duration::from_millis(200));

        let result = f
            .dispatcher
            .handle(DispatchWebhookCommand {
                payload: b"{}".to_vec(),
                signature: None,
            })
            .await
            .unwrap();

        assert_eq!(result, DispatchWebhookResult::TestPing);
        assert_eq!(collaborator_calls(&f), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Acknowledged without mutation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unmonitored_event_is_ignored() {
        let f = fixture();

        let result = f
            .dispatcher
            .handle(signed(event_body("invoice.paid", "active", "price_basic")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Ignored { ref event_type, .. } if event_type == "invoice.paid"));
        assert_eq!(collaborator_calls(&f), 0);
    }

    #[tokio::test]
    async fn unknown_customer_is_unmatched_without_mutation() {
        let f = fixture();

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert_eq!(
            result,
            DispatchWebhookResult::Unmatched {
                event_id: "evt_1".to_string(),
                billing_customer_id: "cus_1".to_string(),
            }
        );
        assert_eq!(f.groups.mutation_count(), 0);
        assert_eq!(f.directory.call_count("update_tier_field"), 0);
    }

    #[tokio::test]
    async fn undecodable_subscription_is_absorbed() {
        let f = fixture();
        let body = json!({
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "created": 1,
            "data": { "object": { "id": "sub_1" } }
        })
        .to_string()
        .into_bytes();

        let result = f.dispatcher.handle(signed(body)).await.unwrap();

        assert_eq!(
            result,
            DispatchWebhookResult::Absorbed {
                event_id: "evt_2".to_string(),
                step: "decode_subscription".to_string(),
            }
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fail-open
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn directory_failure_is_absorbed() {
        let f = fixture();
        f.directory
            .set_method_error("find_by_external_id", DomainError::database("connection refused"));

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Absorbed { ref step, .. } if step == "find_by_external_id"));
    }

    #[tokio::test]
    async fn group_store_failure_is_absorbed() {
        let f = fixture();
        linked_customer(&f);
        f.groups
            .set_method_error("add_member", DomainError::database("deadlock"));

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Absorbed { ref step, .. } if step == "add_member"));
    }

    #[tokio::test]
    async fn downstream_timeout_is_absorbed() {
        let f = fixture_with(false, Duration::from_millis(30));
        linked_customer(&f);
        f.groups
            .set_method_delay("remove_member", Duration::from_millis(500));

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Absorbed { ref step, .. } if step == "remove_member"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Concurrency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_events_leave_single_tier_group() {
        let f = Arc::new(fixture());
        linked_customer(&f);
        f.groups.set_method_delay("add_member", Duration::from_millis(10));

        let mut tasks = Vec::new();
        for i in 0..10 {
            let f = Arc::clone(&f);
            let price = if i % 2 == 0 { "price_basic" } else { "price_premium" };
            let body = event_body("customer.subscription.updated", "active", price);
            tasks.push(tokio::spawn(async move { f.dispatcher.handle(signed(body)).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let memberships = f.groups.memberships(&customer());
        assert_eq!(memberships.len(), 1);
        let tier = f.directory.customer(&customer()).unwrap().tier;
        assert_eq!(
            Some(&memberships[0]),
            f.dispatcher.reconciler.tier_groups().group_for(tier)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn slow_resolution_does_not_let_later_event_overtake() {
        let f = Arc::new(fixture_with(false, Duration::from_secs(2)));
        linked_customer(&f);
        f.directory
            .set_method_delay("find_by_external_id", Duration::from_millis(300));

        let first = {
            let f = Arc::clone(&f);
            let body = event_body("customer.subscription.updated", "active", "price_premium");
            tokio::spawn(async move { f.dispatcher.handle(signed(body)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        f.directory
            .set_method_delay("find_by_external_id", Duration::ZERO);
        let second = {
            let f = Arc::clone(&f);
            let body = event_body("customer.subscription.deleted", "canceled", "price_premium");
            tokio::spawn(async move { f.dispatcher.handle(signed(body)).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert!(f.groups.memberships(&customer()).is_empty());
        assert_eq!(f.directory.customer(&customer()).unwrap().tier, MembershipTier::None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Deadline
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn processing_past_deadline_is_absorbed() {
        let f = with_deadline(fixture_with(false, Duration::from_secs(2)), Duration::from_millis(100));
        linked_customer(&f);
        f.groups
            .set_method_delay("add_member", Duration::from_millis(500));

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Absorbed { ref step, .. } if step == "deadline"));
    }

    #[tokio::test]
    async fn slow_calls_within_deadline_complete() {
        let f = with_deadline(fixture_with(false, Duration::from_secs(2)), Duration::from_secs(5));
        linked_customer(&f);
        f.groups
            .set_method_delay("remove_member", Duration::from_millis(150));
        f.groups
            .set_method_delay("add_member", Duration::from_millis(150));

        let result = f
            .dispatcher
            .handle(signed(event_body("customer.subscription.created", "active", "price_basic")))
            .await
            .unwrap();

        assert!(matches!(result, DispatchWebhookResult::Reconciled { tier: MembershipTier::Basic, .. }));
        assert_eq!(f.groups.memberships(&customer()), vec![group(BASIC_GROUP)]);
    }
}
