//! In-memory customer directory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{Instrumentation, MethodCall};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::domain::membership::MembershipTier;
use crate::ports::{CustomerDirectory, CustomerRecord};

/// Customer directory backed by a `HashMap`.
///
/// Clones share state, so a test can keep a handle for assertions after
/// handing another to the code under test.
#[derive(Clone, Default)]
pub struct InMemoryCustomerDirectory {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    customers: HashMap<CustomerId, CustomerRecord>,
    instrumentation: Instrumentation<DomainError>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a customer with no tier and no billing link.
    pub fn add_customer(&self, id: CustomerId, email: impl Into<String>) {
        self.insert(CustomerRecord {
            id,
            email: email.into(),
            billing_customer_id: None,
            tier: MembershipTier::None,
        });
    }

    /// Inserts or replaces a full record.
    pub fn insert(&self, record: CustomerRecord) {
        self.state().customers.insert(record.id.clone(), record);
    }

    /// Snapshot of a stored record.
    pub fn customer(&self, id: &CustomerId) -> Option<CustomerRecord> {
        self.state().customers.get(id).cloned()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Injection & Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Fail every call to `method` with `error`.
    pub fn set_method_error(&self, method: &str, error: DomainError) {
        self.state().instrumentation.set_error(method, error);
    }

    /// Delay every call to `method`.
    pub fn set_method_delay(&self, method: &str, delay: Duration) {
        self.state().instrumentation.set_delay(method, delay);
    }

    pub fn clear_errors(&self) {
        self.state().instrumentation.clear_errors();
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().instrumentation.calls()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().instrumentation.call_count(method)
    }

    pub fn clear_calls(&self) {
        self.state().instrumentation.clear_calls();
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, method: &str, args: Vec<String>) -> Result<(), DomainError> {
        let (delay, error) = self.state().instrumentation.enter(method, args);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn not_found(id: &CustomerId) -> DomainError {
        DomainError::new(ErrorCode::CustomerNotFound, "Customer not found")
            .with_detail("customer_id", id.as_str())
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn find_by_external_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<CustomerRecord>, DomainError> {
        self.enter("find_by_external_id", vec![billing_customer_id.to_string()])
            .await?;

        Ok(self
            .state()
            .customers
            .values()
            .find(|c| c.billing_customer_id.as_deref() == Some(billing_customer_id))
            .cloned())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, DomainError> {
        self.enter("find_by_id", vec![id.to_string()]).await?;

        Ok(self.state().customers.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, DomainError> {
        self.enter("find_by_email", vec![email.to_string()]).await?;

        let email = email.trim();
        Ok(self
            .state()
            .customers
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn link_external_id(
        &self,
        id: &CustomerId,
        billing_customer_id: &str,
    ) -> Result<(), DomainError> {
        self.enter(
            "link_external_id",
            vec![id.to_string(), billing_customer_id.to_string()],
        )
        .await?;

        let mut state = self.state();
        let customer = state
            .customers
            .get_mut(id)
            .ok_or_else(|| Self::not_found(id))?;
        customer.billing_customer_id = Some(billing_customer_id.to_string());
        Ok(())
    }

    async fn update_tier_field(
        &self,
        id: &CustomerId,
        tier: MembershipTier,
    ) -> Result<(), DomainError> {
        self.enter("update_tier_field", vec![id.to_string(), tier.to_string()])
            .await?;

        let mut state = self.state();
        let customer = state
            .customers
            .get_mut(id)
            .ok_or_else(|| Self::not_found(id))?;
        customer.tier = tier;
        Ok(())
    }

    async fn tier_field(&self, id: &CustomerId) -> Result<Option<MembershipTier>, DomainError> {
        self.enter("tier_field", vec![id.to_string()]).await?;

        Ok(self.state().customers.get(id).map(|c| c.tier))
    }
}
