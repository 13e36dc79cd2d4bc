//! Customer directory port.
//!
//! Narrow view of the commerce system's customer records: identity lookups
//! plus the denormalized membership tier field.
//!
//! # Design
//!
//! - **Lookups return `Option`**: a missing customer is not an error
//! - **Writes are idempotent**: re-linking or re-setting the same value is a no-op

use crate::domain::foundation::{CustomerId, DomainError};
use crate::domain::membership::MembershipTier;
use async_trait::async_trait;
use serde::Serialize;

/// Port for customer record access.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Find the customer linked to a billing-provider customer id.
    async fn find_by_external_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<CustomerRecord>, DomainError>;

    /// Find a customer by internal id.
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, DomainError>;

    /// Find a customer by email address (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, DomainError>;

    /// Record the billing-provider customer id on the customer.
    ///
    /// # Errors
    ///
    /// - `CustomerNotFound` if the customer doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn link_external_id(
        &self,
        id: &CustomerId,
        billing_customer_id: &str,
    ) -> Result<(), DomainError>;

    /// Set the denormalized tier field. `MembershipTier::None` clears it.
    ///
    /// # Errors
    ///
    /// - `CustomerNotFound` if the customer doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_tier_field(
        &self,
        id: &CustomerId,
        tier: MembershipTier,
    ) -> Result<(), DomainError>;

    /// Read the denormalized tier field.
    ///
    /// Returns `None` if the customer doesn't exist.
    async fn tier_field(&self, id: &CustomerId) -> Result<Option<MembershipTier>, DomainError>;
}

/// Customer record as the reconciler sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub email: String,
    pub billing_customer_id: Option<String>,
    pub tier: MembershipTier,
}
