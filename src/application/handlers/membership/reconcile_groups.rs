//! GroupReconciler - converges group membership and the tier field.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{CustomerId, GroupId};
use crate::domain::membership::{MembershipTier, TierGroups};
use crate::ports::{CustomerDirectory, GroupMembership, RemovalOutcome};

use super::downstream::{DownstreamFailure, DownstreamGuard};

/// One mutation performed during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStep {
    RemoveFrom(GroupId),
    AddTo(GroupId),
    UpdateTierField(MembershipTier),
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStep::RemoveFrom(group) => write!(f, "remove_from:{}", group),
            ReconcileStep::AddTo(group) => write!(f, "add_to:{}", group),
            ReconcileStep::UpdateTierField(tier) => write!(f, "update_tier_field:{}", tier),
        }
    }
}

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub customer_id: CustomerId,
    pub target: MembershipTier,
    /// Groups the customer was actually removed from.
    pub removed: Vec<GroupId>,
    /// Groups the customer was already absent from.
    pub not_a_member: Vec<GroupId>,
    pub added: Option<GroupId>,
    pub steps: Vec<ReconcileStep>,
}

/// A reconciliation that stopped part-way.
///
/// Carries enough context to repair the customer by hand or by replaying
/// the event.
#[derive(Debug, Clone, Error)]
#[error("reconciling customer {customer_id} to {target} failed at {failed_step}: {source}")]
pub struct ReconcileError {
    pub customer_id: CustomerId,
    pub target: MembershipTier,
    pub completed: Vec<ReconcileStep>,
    pub failed_step: ReconcileStep,
    #[source]
    pub source: DownstreamFailure,
}

/// Makes group membership and the tier field match a target tier.
///
/// # Steps
///
/// 1. Remove the customer from every tier group other than the target's
/// 2. Add the customer to the target's group, unless the target is `None`
/// 3. Write the tier field (`None` clears it)
///
/// Every step is idempotent, so repeated runs converge. The sequence is not
/// atomic: the first failing step aborts the run.
pub struct GroupReconciler {
    groups: Arc<dyn GroupMembership>,
    directory: Arc<dyn CustomerDirectory>,
    tier_groups: TierGroups,
    guard: DownstreamGuard,
}

impl GroupReconciler {
    pub fn new(
        groups: Arc<dyn GroupMembership>,
        directory: Arc<dyn CustomerDirectory>,
        tier_groups: TierGroups,
        guard: DownstreamGuard,
    ) -> Self {
        Self {
            groups,
            directory,
            tier_groups,
            guard,
        }
    }

    pub fn tier_groups(&self) -> &TierGroups {
        &self.tier_groups
    }

    pub async fn reconcile(
        &self,
        customer_id: &CustomerId,
        target: MembershipTier,
    ) -> Result<ReconcileReport, ReconcileError> {
        let target_group = self.tier_groups.group_for(target);
        let mut report = ReconcileReport {
            customer_id: customer_id.clone(),
            target,
            removed: Vec::new(),
            not_a_member: Vec::new(),
            added: None,
            steps: Vec::new(),
        };

        // 1. Reset
        for group in self.tier_groups.all() {
            if Some(group) == target_group {
                continue;
            }
            let step = ReconcileStep::RemoveFrom(group.clone());
            let outcome = self
                .guard
                .call("remove_member", self.groups.remove_member(group, customer_id))
                .await
                .map_err(|source| failed(&report, step.clone(), source))?;

            match outcome {
                RemovalOutcome::Removed => report.removed.push(group.clone()),
                RemovalOutcome::NotAMember => {
                    tracing::debug!(
                        customer_id = %customer_id,
                        group_id = %group,
                        outcome = outcome.as_str(),
                        "Customer not in tier group"
                    );
                    report.not_a_member.push(group.clone());
                }
            }
            report.steps.push(step);
        }

        // 2. Set
        if let Some(group) = target_group {
            let step = ReconcileStep::AddTo(group.clone());
            self.guard
                .call("add_member", self.groups.add_member(group, customer_id))
                .await
                .map_err(|source| failed(&report, step.clone(), source))?;
            report.added = Some(group.clone());
            report.steps.push(step);
        }

        // 3. Mirror
        let step = ReconcileStep::UpdateTierField(target);
        self.guard
            .call(
                "update_tier_field",
                self.directory.update_tier_field(customer_id, target),
            )
            .await
            .map_err(|source| failed(&report, step.clone(), source))?;
        report.steps.push(step);

        Ok(report)
    }
}

fn failed(report: &ReconcileReport, failed_step: ReconcileStep, source: DownstreamFailure) -> ReconcileError {
    ReconcileError {
        customer_id: report.customer_id.clone(),
        target: report.target,
        completed: report.steps.clone(),
        failed_step,
        source,
    }
}
