//! In-memory group membership.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{Instrumentation, MethodCall};
use crate::domain::foundation::{CustomerId, DomainError, GroupId};
use crate::ports::{GroupMembership, RemovalOutcome};

/// Group membership backed by a map of group to member set.
///
/// Any group id is accepted; groups spring into existence on first add.
#[derive(Clone, Default)]
pub struct InMemoryGroupMembership {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    members: HashMap<GroupId, BTreeSet<CustomerId>>,
    instrumentation: Instrumentation<DomainError>,
}

impl InMemoryGroupMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a membership without recording a call.
    pub fn seed(&self, group: GroupId, customer: CustomerId) {
        self.state().members.entry(group).or_default().insert(customer);
    }

    /// Current members of a group.
    pub fn members(&self, group: &GroupId) -> Vec<CustomerId> {
        self.state()
            .members
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Groups containing the customer, in id order.
    pub fn memberships(&self, customer: &CustomerId) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self
            .state()
            .members
            .iter()
            .filter(|(_, members)| members.contains(customer))
            .map(|(group, _)| group.clone())
            .collect();
        groups.sort();
        groups
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Injection & Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn set_method_error(&self, method: &str, error: DomainError) {
        self.state().instrumentation.set_error(method, error);
    }

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

    /// Calls that changed or attempted to change membership.
    pub fn mutation_count(&self) -> usize {
        self.call_count("add_member") + self.call_count("remove_member")
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
}

#[async_trait]
impl GroupMembership for InMemoryGroupMembership {
    async fn add_member(&self, group: &GroupId, customer: &CustomerId) -> Result<(), DomainError> {
        self.enter("add_member", vec![group.to_string(), customer.to_string()])
            .await?;

        self.state()
            .members
            .entry(group.clone())
            .or_default()
            .insert(customer.clone());
        Ok(())
    }

    async fn remove_member(
        &self,
        group: &GroupId,
        customer: &CustomerId,
    ) -> Result<RemovalOutcome, DomainError> {
        self.enter("remove_member", vec![group.to_string(), customer.to_string()])
            .await?;

        let removed = self
            .state()
            .members
            .get_mut(group)
            .map(|members| members.remove(customer))
            .unwrap_or(false);

        Ok(if removed {
            RemovalOutcome::Removed
        } else {
            RemovalOutcome::NotAMember
        })
    }

    async fn groups_of(&self, customer: &CustomerId) -> Result<Vec<GroupId>, DomainError> {
        self.enter("groups_of", vec![customer.to_string()]).await?;

        Ok(self.memberships(customer))
    }
}
