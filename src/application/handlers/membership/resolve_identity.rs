//! IdentityResolver - maps a billing customer to an internal customer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::CustomerId;
use crate::domain::membership::{CustomerIdentity, ResolutionSource, SubscriptionSnapshot};
use crate::ports::{
    BillingCustomer, BillingProvider, CustomerDirectory, CustomerRecord, INTERNAL_CUSTOMER_ID_KEY,
};

use super::downstream::{DownstreamFailure, DownstreamGuard};

/// Resolves which internal customer a subscription event refers to.
///
/// # Resolution chain
///
/// 1. Directory record already linked to the billing customer id.
/// 2. `internal_customer_id` in the billing customer's metadata.
/// 3. Email from the event, else from the billing customer record.
///
/// The billing customer is fetched at most once per resolution. A match by
/// email writes the mapping back to both sides on a best-effort basis.
pub struct IdentityResolver {
    directory: Arc<dyn CustomerDirectory>,
    billing: Arc<dyn BillingProvider>,
    guard: DownstreamGuard,
}

impl IdentityResolver {
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        billing: Arc<dyn BillingProvider>,
        guard: DownstreamGuard,
    ) -> Self {
        Self {
            directory,
            billing,
            guard,
        }
    }

    /// Resolves the customer behind `snapshot`.
    ///
    /// Returns `Ok(None)` when no step matches. Lookup failures are returned
    /// as `DownstreamFailure`; write-back failures are only logged.
    pub async fn resolve(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Option<CustomerIdentity>, DownstreamFailure> {
        let billing_customer_id = snapshot.billing_customer_id.as_str();

        // 1. Cached mapping on the directory side
        let linked = self
            .guard
            .call(
                "find_by_external_id",
                self.directory.find_by_external_id(billing_customer_id),
            )
            .await?;
        if let Some(record) = linked {
            return Ok(Some(identity(record, billing_customer_id, ResolutionSource::CachedMapping)));
        }

        // 2. Cached mapping on the billing side
        let billing_customer = match self
            .guard
            .call("retrieve_customer", self.billing.retrieve_customer(billing_customer_id))
            .await
        {
            Ok(customer) => customer,
            Err(failure) if snapshot.customer_email.is_some() => {
                tracing::warn!(
                    billing_customer_id,
                    step = failure.step,
                    error = %failure,
                    "Billing customer lookup failed, continuing with event email"
                );
                None
            }
            Err(failure) => return Err(failure),
        };

        if let Some(record) = self.find_by_metadata(billing_customer.as_ref()).await? {
            if record.billing_customer_id.as_deref() != Some(billing_customer_id) {
                self.link_directory(&record.id, billing_customer_id).await;
            }
            return Ok(Some(identity(record, billing_customer_id, ResolutionSource::BillingMetadata)));
        }

        // 3. Email fallback
        let email = snapshot
            .customer_email
            .clone()
            .or_else(|| billing_customer.as_ref().and_then(|c| c.email.clone()));
        let Some(email) = email else {
            return Ok(None);
        };

        let matched = self
            .guard
            .call("find_by_email", self.directory.find_by_email(&email))
            .await?;
        let Some(record) = matched else {
            return Ok(None);
        };

        self.write_back(&record.id, billing_customer_id).await;
        Ok(Some(identity(record, billing_customer_id, ResolutionSource::Email)))
    }

    async fn find_by_metadata(
        &self,
        billing_customer: Option<&BillingCustomer>,
    ) -> Result<Option<CustomerRecord>, DownstreamFailure> {
        let Some(internal_id) = billing_customer.and_then(BillingCustomer::internal_customer_id)
        else {
            return Ok(None);
        };

        let Ok(customer_id) = CustomerId::new(internal_id) else {
            return Ok(None);
        };

        let record = self
            .guard
            .call("find_by_id", self.directory.find_by_id(&customer_id))
            .await?;

        if record.is_none() {
            tracing::warn!(
                customer_id = %customer_id,
                "Billing metadata points at an unknown customer"
            );
        }
        Ok(record)
    }

    /// Stores the mapping on both sides. Failures are logged, never raised.
    async fn write_back(&self, customer_id: &CustomerId, billing_customer_id: &str) {
        let metadata = HashMap::from([(
            INTERNAL_CUSTOMER_ID_KEY.to_string(),
            customer_id.to_string(),
        )]);

        if let Err(failure) = self
            .guard
            .call(
                "write_back_metadata",
                self.billing
                    .update_customer_metadata(billing_customer_id, metadata),
            )
            .await
        {
            tracing::warn!(
                customer_id = %customer_id,
                billing_customer_id,
                step = failure.step,
                error = %failure,
                "Failed to store internal id in billing metadata"
            );
        }

        self.link_directory(customer_id, billing_customer_id).await;
    }

    async fn link_directory(&self, customer_id: &CustomerId, billing_customer_id: &str) {
        if let Err(failure) = self
            .guard
            .call(
                "link_external_id",
                self.directory.link_external_id(customer_id, billing_customer_id),
            )
            .await
        {
            tracing::warn!(
                customer_id = %customer_id,
                billing_customer_id,
                step = failure.step,
                error = %failure,
                "Failed to link billing customer on directory record"
            );
        }
    }
}

fn identity(
    record: CustomerRecord,
    billing_customer_id: &str,
    resolved_via: ResolutionSource,
) -> CustomerIdentity {
    CustomerIdentity {
        customer_id: record.id,
        billing_customer_id: Some(billing_customer_id.to_string()),
        email: record.email,
        resolved_via,
    }
}
