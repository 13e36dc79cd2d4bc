//! Price id to tier mapping.
//!
//! Loaded from configuration so prices can change without a code change.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use super::MembershipTier;

/// What an eligible subscription whose price is not mapped is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPricePolicy {
    /// Unmapped prices grant nothing.
    #[default]
    NoEntitlement,

    /// Unmapped prices grant the lowest paid tier.
    LowestTier,
}

/// Errors building a price map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceTierMapError {
    #[error("No price ids configured for tier {0}")]
    EmptyTier(MembershipTier),

    #[error("Price id '{0}' is configured for both Basic and Premium")]
    Overlap(String),
}

/// Static mapping of billing price identifiers to paid tiers.
///
/// The Basic and Premium sets are disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTierMap {
    basic: HashSet<String>,
    premium: HashSet<String>,
    unmapped_policy: UnmappedPricePolicy,
}

impl PriceTierMap {
    /// Builds a map from the Basic and Premium price sets.
    ///
    /// # Errors
    ///
    /// - `EmptyTier` if either set is empty
    /// - `Overlap` if a price appears in both sets
    pub fn new<B, P>(
        basic: B,
        premium: P,
        unmapped_policy: UnmappedPricePolicy,
    ) -> Result<Self, PriceTierMapError>
    where
        B: IntoIterator,
        B::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let basic: HashSet<String> = normalize(basic);
        let premium: HashSet<String> = normalize(premium);

        if basic.is_empty() {
            return Err(PriceTierMapError::EmptyTier(MembershipTier::Basic));
        }
        if premium.is_empty() {
            return Err(PriceTierMapError::EmptyTier(MembershipTier::Premium));
        }

        let mut overlap: Vec<&String> = basic.intersection(&premium).collect();
        overlap.sort();
        if let Some(price) = overlap.first() {
            return Err(PriceTierMapError::Overlap((*price).clone()));
        }

        Ok(Self {
            basic,
            premium,
            unmapped_policy,
        })
    }

    /// Returns the tier a price maps to, if any.
    pub fn tier_for(&self, price_id: &str) -> Option<MembershipTier> {
        if self.premium.contains(price_id) {
            Some(MembershipTier::Premium)
        } else if self.basic.contains(price_id) {
            Some(MembershipTier::Basic)
        } else {
            None
        }
    }

    pub fn unmapped_policy(&self) -> UnmappedPricePolicy {
        self.unmapped_policy
    }

    /// Tier granted to an eligible subscription with no mapped price.
    pub fn unmapped_tier(&self) -> MembershipTier {
        match self.unmapped_policy {
            UnmappedPricePolicy::NoEntitlement => MembershipTier::None,
            UnmappedPricePolicy::LowestTier => MembershipTier::Basic,
        }
    }
}

fn normalize<I>(ids: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    ids.into_iter()
        .map(Into::into)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
