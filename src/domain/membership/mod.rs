//! Membership domain module.
//!
//! Pure types and rules for subscription entitlements: tiers, price
//! mapping, classification, and webhook authentication.
//!
//! # Module Structure
//!
//! - `tier` - MembershipTier entitlement levels
//! - `subscription` - SubscriptionSnapshot decoded from billing events
//! - `price_tier_map` - configured price to tier mapping
//! - `classifier` - TierClassifier
//! - `tier_groups` - TierGroups, the customer group per paid tier
//! - `identity` - CustomerIdentity produced by identity resolution
//! - `stripe_event` - raw webhook envelope
//! - `webhook_verifier` - SignatureVerifier

mod classifier;
mod identity;
mod price_tier_map;
mod stripe_event;
mod subscription;
mod tier;
mod tier_groups;
mod webhook_errors;
mod webhook_verifier;

pub use classifier::TierClassifier;
pub use identity::{CustomerIdentity, ResolutionSource};
pub use price_tier_map::{PriceTierMap, PriceTierMapError, UnmappedPricePolicy};
pub use stripe_event::{StripeEvent, StripeEventData, SubscriptionEventType};
pub use subscription::{SubscriptionSnapshot, SubscriptionStatus};
pub use tier::MembershipTier;
pub use tier_groups::TierGroups;
pub use webhook_errors::SignatureError;
pub use webhook_verifier::{
    signature_header, SignatureHeader, SignatureVerifier, Verification, DEFAULT_TOLERANCE,
};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
