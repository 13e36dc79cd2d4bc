//! Membership tier definitions.
//!
//! Represents the entitlement levels a billing subscription can grant.

use serde::{Deserialize, Serialize};

/// Membership entitlement tier.
///
/// Closed set: a customer holds exactly one of these at any time, and at
/// most one tier group mirrors it in the commerce store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    /// No paid entitlement.
    None,

    /// Basic membership.
    Basic,

    /// Premium membership.
    Premium,
}

impl MembershipTier {
    /// Paid tiers, lowest first.
    pub const PAID: [MembershipTier; 2] = [MembershipTier::Basic, MembershipTier::Premium];

    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, MembershipTier::None)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipTier::None => "None",
            MembershipTier::Basic => "Basic",
            MembershipTier::Premium => "Premium",
        }
    }

    /// Value stored in the denormalized tier field.
    ///
    /// `None` is stored as an absent value rather than a string.
    pub fn field_value(&self) -> Option<&'static str> {
        match self {
            MembershipTier::None => None,
            MembershipTier::Basic => Some("basic"),
            MembershipTier::Premium => Some("premium"),
        }
    }

    /// Parses a denormalized tier field value back into a tier.
    ///
    /// Unknown or absent values read as `None`.
    pub fn from_field_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("basic") => MembershipTier::Basic,
            Some("premium") => MembershipTier::Premium,
            _ => MembershipTier::None,
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
