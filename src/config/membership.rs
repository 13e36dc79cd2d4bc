//! Membership reconciliation configuration
//!
//! Price ids are comma-separated lists so a tier can span several prices
//! (monthly and annual, for example).

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::foundation::GroupId;
use crate::domain::membership::{PriceTierMap, TierClassifier, TierGroups, UnmappedPricePolicy};

/// Membership configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipConfig {
    /// Price ids granting Basic (comma-separated)
    #[serde(default)]
    pub basic_price_ids: String,

    /// Price ids granting Premium (comma-separated)
    #[serde(default)]
    pub premium_price_ids: String,

    /// Customer group mirroring Basic
    #[serde(default)]
    pub basic_group_id: String,

    /// Customer group mirroring Premium
    #[serde(default)]
    pub premium_group_id: String,

    /// Tier for eligible subscriptions on an unmapped price
    #[serde(default)]
    pub unmapped_price_policy: UnmappedPricePolicy,

    /// Timeout for each call to the store or the billing provider
    #[serde(default = "default_downstream_timeout")]
    pub downstream_timeout_ms: u64,

    /// Budget for all work on one webhook delivery, lock waits included
    #[serde(default = "default_dispatch_deadline")]
    pub dispatch_deadline_ms: u64,
}

impl MembershipConfig {
    pub fn downstream_timeout(&self) -> Duration {
        Duration::from_millis(self.downstream_timeout_ms)
    }

    pub fn dispatch_deadline(&self) -> Duration {
        Duration::from_millis(self.dispatch_deadline_ms)
    }

    /// Builds the price map from the configured lists.
    pub fn price_tier_map(&self) -> Result<PriceTierMap, ValidationError> {
        PriceTierMap::new(
            split_list(&self.basic_price_ids),
            split_list(&self.premium_price_ids),
            self.unmapped_price_policy,
        )
        .map_err(|e| ValidationError::InvalidPriceMapping(e.to_string()))
    }

    pub fn classifier(&self) -> Result<TierClassifier, ValidationError> {
        Ok(TierClassifier::new(self.price_tier_map()?))
    }

    /// Builds the tier group pair.
    pub fn tier_groups(&self) -> Result<TierGroups, ValidationError> {
        let basic = GroupId::new(self.basic_group_id.trim())
            .map_err(|_| ValidationError::MissingRequired("MEMBERSHIP__BASIC_GROUP_ID"))?;
        let premium = GroupId::new(self.premium_group_id.trim())
            .map_err(|_| ValidationError::MissingRequired("MEMBERSHIP__PREMIUM_GROUP_ID"))?;
        TierGroups::new(basic, premium).map_err(|e| ValidationError::InvalidTierGroups(e.to_string()))
    }

    /// Validate membership configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.price_tier_map()?;
        self.tier_groups()?;
        if self.downstream_timeout_ms == 0 {
            return Err(ValidationError::InvalidDownstreamTimeout);
        }
        if self.dispatch_deadline_ms < self.downstream_timeout_ms {
            return Err(ValidationError::InvalidDispatchDeadline);
        }
        Ok(())
    }
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            basic_price_ids: String::new(),
            premium_price_ids: String::new(),
            basic_group_id: String::new(),
            premium_group_id: String::new(),
            unmapped_price_policy: UnmappedPricePolicy::default(),
            downstream_timeout_ms: default_downstream_timeout(),
            dispatch_deadline_ms: default_dispatch_deadline(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_downstream_timeout() -> u64 {
    5000
}

fn default_dispatch_deadline() -> u64 {
    60_000
}
