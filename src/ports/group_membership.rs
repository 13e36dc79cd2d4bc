//! Group membership port.

use crate::domain::foundation::{CustomerId, DomainError, GroupId};
use async_trait::async_trait;

/// Port for customer-group membership in the commerce system.
#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// Add a customer to a group. Adding an existing member is a no-op.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound` / `CustomerNotFound` for unknown ids
    /// - `DatabaseError` on persistence failure
    async fn add_member(&self, group: &GroupId, customer: &CustomerId) -> Result<(), DomainError>;

    /// Remove a customer from a group.
    ///
    /// Removing a non-member is not an error; it reports `NotAMember`.
    async fn remove_member(
        &self,
        group: &GroupId,
        customer: &CustomerId,
    ) -> Result<RemovalOutcome, DomainError>;

    /// All groups the customer belongs to.
    async fn groups_of(&self, customer: &CustomerId) -> Result<Vec<GroupId>, DomainError>;
}

/// Result of a removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    NotAMember,
}

impl RemovalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalOutcome::Removed => "removed",
            RemovalOutcome::NotAMember => "not_a_member",
        }
    }
}
