//! GetMembershipStatusHandler - Query handler computing a customer's tier
//! directly from the billing provider.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::domain::membership::{
    MembershipTier, SubscriptionEventType, SubscriptionStatus, TierClassifier,
};
use crate::ports::{BillingProvider, CustomerDirectory, CustomerRecord, INTERNAL_CUSTOMER_ID_KEY};

use super::downstream::DownstreamGuard;

/// Query to get a customer's live membership status.
#[derive(Debug, Clone)]
pub struct GetMembershipStatusQuery {
    pub customer_id: CustomerId,
}

/// Live membership status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipStatusView {
    pub customer_id: CustomerId,
    pub tier: MembershipTier,
    pub billing_customer_id: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub price_id: Option<String>,
}

/// Handler for live membership status.
///
/// Finds the billing customer (linked id, then `internal_customer_id`
/// metadata, then email), takes the first `active`/`trialing` subscription
/// and classifies it. Billing-provider failures degrade to `None`.
pub struct GetMembershipStatusHandler {
    directory: Arc<dyn CustomerDirectory>,
    billing: Arc<dyn BillingProvider>,
    classifier: TierClassifier,
    guard: DownstreamGuard,
}

impl GetMembershipStatusHandler {
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        billing: Arc<dyn BillingProvider>,
        classifier: TierClassifier,
        guard: DownstreamGuard,
    ) -> Self {
        Self {
            directory,
            billing,
            classifier,
            guard,
        }
    }

    /// # Errors
    ///
    /// - `CustomerNotFound` if the customer doesn't exist
    /// - `Timeout` / `ExternalServiceError` if the directory lookup fails
    pub async fn handle(
        &self,
        query: GetMembershipStatusQuery,
    ) -> Result<MembershipStatusView, DomainError> {
        let record = self
            .guard
            .call("find_by_id", self.directory.find_by_id(&query.customer_id))
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::CustomerNotFound, "Customer not found")
                    .with_detail("customer_id", query.customer_id.as_str())
            })?;

        let mut view = MembershipStatusView {
            customer_id: record.id.clone(),
            tier: MembershipTier::None,
            billing_customer_id: None,
            subscription_status: None,
            price_id: None,
        };

        let Some(billing_customer_id) = self.billing_customer_id(&record).await else {
            return Ok(view);
        };
        view.billing_customer_id = Some(billing_customer_id.clone());

        let subscriptions = match self
            .guard
            .call(
                "list_subscriptions",
                self.billing.list_subscriptions(&billing_customer_id),
            )
            .await
        {
            Ok(subscriptions) => subscriptions,
            Err(failure) => {
                tracing::warn!(
                    customer_id = %record.id,
                    billing_customer_id = %billing_customer_id,
                    error = %failure,
                    "Could not list subscriptions, reporting no membership"
                );
                return Ok(view);
            }
        };

        if let Some(subscription) = subscriptions.iter().find(|s| s.status.is_entitled()) {
            view.tier = self
                .classifier
                .classify(SubscriptionEventType::Updated, subscription);
            view.subscription_status = Some(subscription.status);
            view.price_id = subscription.price_id().map(String::from);
        }

        Ok(view)
    }

    async fn billing_customer_id(&self, record: &CustomerRecord) -> Option<String> {
        if let Some(id) = &record.billing_customer_id {
            return Some(id.clone());
        }

        let by_metadata = self
            .guard
            .call(
                "find_customer_by_metadata",
                self.billing
                    .find_customer_by_metadata(INTERNAL_CUSTOMER_ID_KEY, record.id.as_str()),
            )
            .await;
        match by_metadata {
            Ok(Some(customer)) => return Some(customer.id),
            Ok(None) => {}
            Err(failure) => {
                tracing::warn!(customer_id = %record.id, error = %failure, "Billing metadata search failed");
            }
        }

        match self
            .guard
            .call(
                "find_customer_by_email",
                self.billing.find_customer_by_email(&record.email),
            )
            .await
        {
            Ok(customer) => customer.map(|c| c.id),
            Err(failure) => {
                tracing::warn!(customer_id = %record.id, error = %failure, "Billing email search failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCustomerDirectory;
    use crate::adapters::stripe::MockBillingProvider;
    use crate::domain::membership::{PriceTierMap, SubscriptionSnapshot, UnmappedPricePolicy};
    use crate::ports::PaymentError;
    use std::time::Duration;

    struct Fixture {
        directory: InMemoryCustomerDirectory,
        billing: MockBillingProvider,
        handler: GetMembershipStatusHandler,
    }

    fn fixture() -> Fixture {
        let directory = InMemoryCustomerDirectory::new();
        let billing = MockBillingProvider::new();
        let classifier = TierClassifier::new(
            PriceTierMap::new(["price_basic"], ["price_premium"], UnmappedPricePolicy::NoEntitlement)
                .unwrap(),
        );
        let handler = GetMembershipStatusHandler::new(
            Arc::new(directory.clone()),
            Arc::new(billing.clone()),
            classifier,
            DownstreamGuard::new(Duration::from_millis(200)),
        );
        directory.add_customer(customer(), "a@example.com");
        Fixture {
            directory,
            billing,
            handler,
        }
    }

    fn customer() -> CustomerId {
        CustomerId::new("7").unwrap()
    }

    fn subscription(id: &str, status: SubscriptionStatus, price: &str) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            billing_subscription_id: id.to_string(),
            billing_customer_id: "cus_1".to_string(),
            status,
            price_ids: vec![price.to_string()],
            customer_email: None,
        }
    }

    fn query() -> GetMembershipStatusQuery {
        GetMembershipStatusQuery {
            customer_id: customer(),
        }
    }

    #[tokio::test]
    async fn finds_billing_customer_by_email_and_classifies() {
        let f = fixture();
        f.billing
            .add_customer(MockBillingProvider::customer("cus_1", "a@example.com"));
        f.billing
            .add_subscription(subscription("sub_1", SubscriptionStatus::Active, "price_premium"));

        let view = f.handler.handle(query()).await.unwrap();

        assert_eq!(view.tier, MembershipTier::Premium);
        assert_eq!(view.billing_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(view.price_id.as_deref(), Some("price_premium"));
        assert_eq!(f.billing.call_count("find_customer_by_metadata"), 1);
    }

    #[tokio::test]
    async fn prefers_first_entitled_subscription() {
        let f = fixture();
        f.billing
            .add_customer(MockBillingProvider::customer("cus_1", "a@example.com"));
        f.billing
            .add_subscription(subscription("sub_old", SubscriptionStatus::Trialing, "price_basic"));
        f.billing
            .add_subscription(subscription("sub_new", SubscriptionStatus::Canceled, "price_premium"));

        let view = f.handler.handle(query()).await.unwrap();

        assert_eq!(view.tier, MembershipTier::Basic);
        assert_eq!(view.subscription_status, Some(SubscriptionStatus::Trialing));
    }

    #[tokio::test]
    async fn linked_billing_id_skips_search() {
        let f = fixture();
        let mut record = f.directory.customer(&customer()).unwrap();
        record.billing_customer_id = Some("cus_1".to_string());
        f.directory.insert(record);
        f.billing
            .add_subscription(subscription("sub_1", SubscriptionStatus::Active, "price_basic"));

        let view = f.handler.handle(query()).await.unwrap();

        assert_eq!(view.tier, MembershipTier::Basic);
        assert!(!f.billing.was_called("find_customer_by_metadata"));
        assert!(!f.billing.was_called("find_customer_by_email"));
    }

    #[tokio::test]
    async fn no_billing_customer_is_none() {
        let f = fixture();

        let view = f.handler.handle(query()).await.unwrap();

        assert_eq!(view.tier, MembershipTier::None);
        assert!(view.billing_customer_id.is_none());
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_none() {
        let f = fixture();
        f.billing
            .add_customer(MockBillingProvider::customer("cus_1", "a@example.com"));
        f.billing
            .set_method_error("list_subscriptions", PaymentError::network("down"));

        let view = f.handler.handle(query()).await.unwrap();

        assert_eq!(view.tier, MembershipTier::None);
        assert_eq!(view.billing_customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn unknown_customer_is_not_found() {
        let f = fixture();

        let err = f
            .handler
            .handle(GetMembershipStatusQuery {
                customer_id: CustomerId::new("404").unwrap(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CustomerNotFound);
    }
}
