//! GetCustomerGroupsHandler - Query handler for a customer's tier groups.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, GroupId};
use crate::domain::membership::{MembershipTier, TierGroups};
use crate::ports::{CustomerDirectory, GroupMembership};

use super::downstream::DownstreamGuard;

/// Query to get the tier groups a customer belongs to.
#[derive(Debug, Clone)]
pub struct GetCustomerGroupsQuery {
    pub customer_id: CustomerId,
}

/// Tier group memberships plus the denormalized tier field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerGroupsView {
    pub customer_id: CustomerId,
    pub groups: Vec<GroupId>,
    pub tier: MembershipTier,
}

impl CustomerGroupsView {
    /// True when the groups and the tier field agree.
    pub fn is_consistent(&self, tier_groups: &TierGroups) -> bool {
        let expected: Vec<&GroupId> = tier_groups.group_for(self.tier).into_iter().collect();
        self.groups.iter().collect::<Vec<_>>() == expected
    }
}

/// Handler for tier group lookups. Groups that are not tier groups are
/// filtered out.
pub struct GetCustomerGroupsHandler {
    directory: Arc<dyn CustomerDirectory>,
    groups: Arc<dyn GroupMembership>,
    tier_groups: TierGroups,
    guard: DownstreamGuard,
}

impl GetCustomerGroupsHandler {
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        groups: Arc<dyn GroupMembership>,
        tier_groups: TierGroups,
        guard: DownstreamGuard,
    ) -> Self {
        Self {
            directory,
            groups,
            tier_groups,
            guard,
        }
    }

    pub async fn handle(&self, query: GetCustomerGroupsQuery) -> Result<CustomerGroupsView, DomainError> {
        let tier = self
            .guard
            .call("tier_field", self.directory.tier_field(&query.customer_id))
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::CustomerNotFound, "Customer not found")
                    .with_detail("customer_id", query.customer_id.as_str())
            })?;

        let mut groups: Vec<GroupId> = self
            .guard
            .call("groups_of", self.groups.groups_of(&query.customer_id))
            .await?
            .into_iter()
            .filter(|g| self.tier_groups.tier_of(g).is_some())
            .collect();
        groups.sort_by_key(|g| self.tier_groups.tier_of(g));

        let view = CustomerGroupsView {
            customer_id: query.customer_id,
            groups,
            tier,
        };

        if !view.is_consistent(&self.tier_groups) {
            tracing::warn!(
                customer_id = %view.customer_id,
                tier = %view.tier,
                groups = ?view.groups,
                "Tier groups and tier field disagree"
            );
        }

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCustomerDirectory, InMemoryGroupMembership};
    use std::time::Duration;

    fn customer() -> CustomerId {
        CustomerId::new("7").unwrap()
    }

    fn group(id: &str) -> GroupId {
        GroupId::new(id).unwrap()
    }

    fn setup() -> (InMemoryCustomerDirectory, InMemoryGroupMembership, GetCustomerGroupsHandler) {
        let directory = InMemoryCustomerDirectory::new();
        let groups = InMemoryGroupMembership::new();
        let handler = GetCustomerGroupsHandler::new(
            Arc::new(directory.clone()),
            Arc::new(groups.clone()),
            TierGroups::new(group("10"), group("20")).unwrap(),
            DownstreamGuard::new(Duration::from_millis(200)),
        );
        directory.add_customer(customer(), "a@example.com");
        (directory, groups, handler)
    }

    #[tokio::test]
    async fn returns_tier_groups_and_field() {
        let (directory, groups, handler) = setup();
        groups.seed(group("20"), customer());
        groups.seed(group("99"), customer());
        let mut record = directory.customer(&customer()).unwrap();
        record.tier = MembershipTier::Premium;
        directory.insert(record);

        let view = handler
            .handle(GetCustomerGroupsQuery {
                customer_id: customer(),
            })
            .await
            .unwrap();

        assert_eq!(view.groups, vec![group("20")]);
        assert_eq!(view.tier, MembershipTier::Premium);
        assert!(view.is_consistent(&handler.tier_groups));
    }

    #[tokio::test]
    async fn detects_inconsistent_state() {
        let (_directory, groups, handler) = setup();
        groups.seed(group("10"), customer());
        groups.seed(group("20"), customer());

        let view = handler
            .handle(GetCustomerGroupsQuery {
                customer_id: customer(),
            })
            .await
            .unwrap();

        assert_eq!(view.groups, vec![group("10"), group("20")]);
        assert!(!view.is_consistent(&handler.tier_groups));
    }

    #[tokio::test]
    async fn unknown_customer_is_not_found() {
        let (_directory, _groups, handler) = setup();

        let err = handler
            .handle(GetCustomerGroupsQuery {
                customer_id: CustomerId::new("404").unwrap(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::CustomerNotFound);
    }
}
