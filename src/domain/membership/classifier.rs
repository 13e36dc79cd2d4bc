//! Tier classification.
//!
//! Derives the tier a subscription event entitles its customer to. Pure and
//! total: no I/O, no failure path.

use super::{MembershipTier, PriceTierMap, SubscriptionEventType, SubscriptionSnapshot};

/// Classifies subscription snapshots into membership tiers.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    prices: PriceTierMap,
}

impl TierClassifier {
    pub fn new(prices: PriceTierMap) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &PriceTierMap {
        &self.prices
    }

    /// Computes the tier for a subscription event.
    ///
    /// # Rules
    ///
    /// 1. Deletion events and statuses other than `active`/`trialing`
    ///    classify as `None`, whatever the price.
    /// 2. Otherwise every line item's price is looked up; the highest mapped
    ///    tier wins and unmapped items are ignored.
    /// 3. If no line item maps, the configured unmapped-price policy decides.
    pub fn classify(
        &self,
        event_type: SubscriptionEventType,
        snapshot: &SubscriptionSnapshot,
    ) -> MembershipTier {
        if event_type.is_deletion() || !snapshot.status.is_entitled() {
            return MembershipTier::None;
        }

        snapshot
            .price_ids
            .iter()
            .filter_map(|price| self.prices.tier_for(price))
            .max()
            .unwrap_or_else(|| self.prices.unmapped_tier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::membership::{SubscriptionStatus, UnmappedPricePolicy};
    use proptest::prelude::*;

    const BASIC: [&str; 2] = ["price_basic_monthly", "price_basic_yearly"];
    const PREMIUM: [&str; 2] = ["price_premium_monthly", "price_premium_yearly"];

    fn classifier(policy: UnmappedPricePolicy) -> TierClassifier {
        TierClassifier::new(PriceTierMap::new(BASIC, PREMIUM, policy).unwrap())
    }

    fn snapshot(status: SubscriptionStatus, prices: &[&str]) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            billing_subscription_id: "sub_1".to_string(),
            billing_customer_id: "cus_1".to_string(),
            status,
            price_ids: prices.iter().map(|p| p.to_string()).collect(),
            customer_email: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Eligibility
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn active_basic_price_is_basic() {
        let tier = classifier(UnmappedPricePolicy::NoEntitlement).classify(
            SubscriptionEventType::Created,
            &snapshot(SubscriptionStatus::Active, &["price_basic_monthly"]),
        );
        assert_eq!(tier, MembershipTier::Basic);
    }

    #[test]
    fn trialing_premium_price_is_premium() {
        let tier = classifier(UnmappedPricePolicy::NoEntitlement).classify(
            SubscriptionEventType::Updated,
            &snapshot(SubscriptionStatus::Trialing, &["price_premium_yearly"]),
        );
        assert_eq!(tier, MembershipTier::Premium);
    }

    #[test]
    fn past_due_is_none_even_with_premium_price() {
        let tier = classifier(UnmappedPricePolicy::LowestTier).classify(
            SubscriptionEventType::Updated,
            &snapshot(SubscriptionStatus::PastDue, &["price_premium_monthly"]),
        );
        assert_eq!(tier, MembershipTier::None);
    }

    #[test]
    fn deleted_event_is_none_even_when_status_active() {
        let tier = classifier(UnmappedPricePolicy::LowestTier).classify(
            SubscriptionEventType::Deleted,
            &snapshot(SubscriptionStatus::Active, &["price_premium_monthly"]),
        );
        assert_eq!(tier, MembershipTier::None);
    }

    // ══════════════════════════════════════════════════════════════
    // Unmapped price policy
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn unmapped_price_grants_nothing_by_default() {
        let tier = classifier(UnmappedPricePolicy::default()).classify(
            SubscriptionEventType::Created,
            &snapshot(SubscriptionStatus::Active, &["price_unknown"]),
        );
        assert_eq!(tier, MembershipTier::None);
    }

    #[test]
    fn unmapped_price_grants_basic_under_lowest_tier_policy() {
        let tier = classifier(UnmappedPricePolicy::LowestTier).classify(
            SubscriptionEventType::Created,
            &snapshot(SubscriptionStatus::Active, &["price_unknown"]),
        );
        assert_eq!(tier, MembershipTier::Basic);
    }

    #[test]
    fn subscription_without_items_follows_unmapped_policy() {
        let no_entitlement = classifier(UnmappedPricePolicy::NoEntitlement);
        let lowest = classifier(UnmappedPricePolicy::LowestTier);
        let empty = snapshot(SubscriptionStatus::Active, &[]);

        assert_eq!(
            no_entitlement.classify(SubscriptionEventType::Updated, &empty),
            MembershipTier::None
        );
        assert_eq!(
            lowest.classify(SubscriptionEventType::Updated, &empty),
            MembershipTier::Basic
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Multiple line items
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn highest_mapped_item_wins() {
        let tier = classifier(UnmappedPricePolicy::NoEntitlement).classify(
            SubscriptionEventType::Updated,
            &snapshot(
                SubscriptionStatus::Active,
                &["price_basic_monthly", "price_premium_monthly"],
            ),
        );
        assert_eq!(tier, MembershipTier::Premium);
    }

    #[test]
    fn unmapped_items_are_ignored_when_another_item_maps() {
        let tier = classifier(UnmappedPricePolicy::NoEntitlement).classify(
            SubscriptionEventType::Updated,
            &snapshot(
                SubscriptionStatus::Active,
                &["price_addon_stickers", "price_basic_yearly"],
            ),
        );
        assert_eq!(tier, MembershipTier::Basic);
    }

    // ══════════════════════════════════════════════════════════════
    // Totality
    // ══════════════════════════════════════════════════════════════

    fn any_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop_oneof![
            Just(SubscriptionStatus::Trialing),
            Just(SubscriptionStatus::Active),
            Just(SubscriptionStatus::PastDue),
            Just(SubscriptionStatus::Unpaid),
            Just(SubscriptionStatus::Canceled),
            Just(SubscriptionStatus::Incomplete),
            Just(SubscriptionStatus::IncompleteExpired),
            Just(SubscriptionStatus::Paused),
            Just(SubscriptionStatus::Unknown),
        ]
    }

    fn any_event_type() -> impl Strategy<Value = SubscriptionEventType> {
        prop_oneof![
            Just(SubscriptionEventType::Created),
            Just(SubscriptionEventType::Updated),
            Just(SubscriptionEventType::Deleted),
        ]
    }

    proptest! {
        #[test]
        fn eligible_basic_prices_classify_basic(
            status in prop_oneof![Just(SubscriptionStatus::Active), Just(SubscriptionStatus::Trialing)],
            idx in 0usize..2,
        ) {
            let tier = classifier(UnmappedPricePolicy::NoEntitlement)
                .classify(SubscriptionEventType::Updated, &snapshot(status, &[BASIC[idx]]));
            prop_assert_eq!(tier, MembershipTier::Basic);
        }

        #[test]
        fn eligible_premium_prices_classify_premium(
            status in prop_oneof![Just(SubscriptionStatus::Active), Just(SubscriptionStatus::Trialing)],
            idx in 0usize..2,
        ) {
            let tier = classifier(UnmappedPricePolicy::NoEntitlement)
                .classify(SubscriptionEventType::Created, &snapshot(status, &[PREMIUM[idx]]));
            prop_assert_eq!(tier, MembershipTier::Premium);
        }

        #[test]
        fn ineligible_or_deleted_is_always_none(
            status in any_status(),
            event_type in any_event_type(),
            price in "[a-z_]{0,24}",
            lowest in any::<bool>(),
        ) {
            prop_assume!(event_type.is_deletion() || !status.is_entitled());
            let policy = if lowest {
                UnmappedPricePolicy::LowestTier
            } else {
                UnmappedPricePolicy::NoEntitlement
            };
            let prices = [price.as_str(), PREMIUM[0], BASIC[0]];
            let tier = classifier(policy).classify(event_type, &snapshot(status, &prices));
            prop_assert_eq!(tier, MembershipTier::None);
        }
    }
}
