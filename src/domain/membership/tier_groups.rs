//! Customer groups that represent paid tiers.

use crate::domain::foundation::{GroupId, ValidationError};

use super::MembershipTier;

/// The configured group for each paid tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierGroups {
    basic: GroupId,
    premium: GroupId,
}

impl TierGroups {
    /// # Errors
    ///
    /// `InvalidFormat` if both tiers point at the same group.
    pub fn new(basic: GroupId, premium: GroupId) -> Result<Self, ValidationError> {
        if basic == premium {
            return Err(ValidationError::invalid_format(
                "premium_group_id",
                "must differ from basic_group_id",
            ));
        }
        Ok(Self { basic, premium })
    }

    /// Group for a tier; `None` has no group.
    pub fn group_for(&self, tier: MembershipTier) -> Option<&GroupId> {
        match tier {
            MembershipTier::None => None,
            MembershipTier::Basic => Some(&self.basic),
            MembershipTier::Premium => Some(&self.premium),
        }
    }

    /// Tier a group represents, if it is a tier group.
    pub fn tier_of(&self, group: &GroupId) -> Option<MembershipTier> {
        if group == &self.basic {
            Some(MembershipTier::Basic)
        } else if group == &self.premium {
            Some(MembershipTier::Premium)
        } else {
            None
        }
    }

    /// Every tier group, lowest tier first.
    pub fn all(&self) -> [&GroupId; 2] {
        [&self.basic, &self.premium]
    }
}
