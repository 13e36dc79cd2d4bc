//! Mock billing provider for development and testing.
//!
//! Provides a configurable implementation of `BillingProvider` backed by
//! in-process maps. Supports:
//! - Pre-configured customers and subscriptions
//! - Error injection and artificial latency per method
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::memory::{Instrumentation, MethodCall};
use crate::domain::membership::SubscriptionSnapshot;
use crate::ports::{BillingCustomer, BillingProvider, PaymentError};

/// Mock billing provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockBillingProvider::new();
/// mock.add_customer(MockBillingProvider::customer("cus_1", "a@example.com"));
/// mock.set_method_error("retrieve_customer", PaymentError::network("down"));
/// ```
#[derive(Clone, Default)]
pub struct MockBillingProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Customers by provider ID.
    customers: HashMap<String, BillingCustomer>,

    /// Subscriptions by provider customer ID, most recent first.
    subscriptions: HashMap<String, Vec<SubscriptionSnapshot>>,

    instrumentation: Instrumentation<PaymentError>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a customer with no metadata.
    pub fn customer(id: &str, email: &str) -> BillingCustomer {
        BillingCustomer {
            id: id.to_string(),
            email: Some(email.to_string()),
            metadata: HashMap::new(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a customer to the "database".
    pub fn add_customer(&self, customer: BillingCustomer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    /// Add a subscription in front of the customer's existing ones.
    pub fn add_subscription(&self, subscription: SubscriptionSnapshot) {
        self.state()
            .subscriptions
            .entry(subscription.billing_customer_id.clone())
            .or_default()
            .insert(0, subscription);
    }

    /// Current state of a stored customer.
    pub fn stored_customer(&self, id: &str) -> Option<BillingCustomer> {
        self.state().customers.get(id).cloned()
    }

    /// Fail every call to `method` with `error`.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().instrumentation.set_error(method, error);
    }

    /// Delay every call to `method`.
    pub fn set_method_delay(&self, method: &str, delay: Duration) {
        self.state().instrumentation.set_delay(method, delay);
    }

    pub fn clear_errors(&self) {
        self.state().instrumentation.clear_errors();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().instrumentation.calls()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().instrumentation.call_count(method)
    }

    pub fn clear_calls(&self) {
        self.state().instrumentation.clear_calls();
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        let (delay, error) = self.state().instrumentation.enter(method, args);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn sorted_customers(state: &MockState) -> Vec<&BillingCustomer> {
        let mut customers: Vec<&BillingCustomer> = state.customers.values().collect();
        customers.sort_by(|a, b| a.id.cmp(&b.id));
        customers
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn retrieve_customer(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError> {
        self.enter("retrieve_customer", vec![billing_customer_id.to_string()])
            .await?;

        Ok(self.state().customers.get(billing_customer_id).cloned())
    }

    async fn update_customer_metadata(
        &self,
        billing_customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), PaymentError> {
        let mut args = vec![billing_customer_id.to_string()];
        let mut pairs: Vec<String> = metadata.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        args.extend(pairs);
        self.enter("update_customer_metadata", args).await?;

        let mut state = self.state();
        let customer = state
            .customers
            .get_mut(billing_customer_id)
            .ok_or_else(|| PaymentError::not_found("Customer"))?;
        customer.metadata.extend(metadata);
        Ok(())
    }

    async fn find_customer_by_metadata(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError> {
        self.enter(
            "find_customer_by_metadata",
            vec![key.to_string(), value.to_string()],
        )
        .await?;

        let state = self.state();
        Ok(Self::sorted_customers(&state)
            .into_iter()
            .find(|c| c.metadata.get(key).map(String::as_str) == Some(value))
            .cloned())
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError> {
        self.enter("find_customer_by_email", vec![email.to_string()])
            .await?;

        let state = self.state();
        Ok(Self::sorted_customers(&state)
            .into_iter()
            .find(|c| {
                c.email
                    .as_deref()
                    .map(|e| e.eq_ignore_ascii_case(email.trim()))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn list_subscriptions(
        &self,
        billing_customer_id: &str,
    ) -> Result<Vec<SubscriptionSnapshot>, PaymentError> {
        self.enter("list_subscriptions", vec![billing_customer_id.to_string()])
            .await?;

        Ok(self
            .state()
            .subscriptions
            .get(billing_customer_id)
            .cloned()
            .unwrap_or_default())
    }
}
