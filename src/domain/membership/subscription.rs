//! Subscription snapshot carried by subscription lifecycle events.

use serde::{Deserialize, Serialize};

/// Subscription status as reported by the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is in trial period.
    Trialing,

    /// Subscription is active and current.
    Active,

    /// Payment is past due.
    PastDue,

    /// Payment retries exhausted, subscription left open but unpaid.
    Unpaid,

    /// Subscription is canceled.
    Canceled,

    /// Initial payment incomplete.
    Incomplete,

    /// Initial payment never completed.
    IncompleteExpired,

    /// Subscription is paused.
    Paused,

    /// Status not known to this service.
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Returns true if the status can carry a paid entitlement.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

/// The subscription state an event reports, reduced to what
/// classification and identity resolution need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// Provider's subscription ID.
    pub billing_subscription_id: String,

    /// Provider's customer ID.
    pub billing_customer_id: String,

    /// Current subscription status.
    pub status: SubscriptionStatus,

    /// Price ids of every line item, in provider order.
    pub price_ids: Vec<String>,

    /// Customer email, when the payload carries one.
    pub customer_email: Option<String>,
}

impl SubscriptionSnapshot {
    /// Price of the first line item.
    pub fn price_id(&self) -> Option<&str> {
        self.price_ids.first().map(String::as_str)
    }

    /// Decodes a snapshot from a Stripe subscription object.
    ///
    /// Accepts the customer either as an id string or as an expanded
    /// customer object, and falls back to the legacy `plan` field when the
    /// subscription carries no items.
    pub fn from_stripe_object(object: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let raw: RawSubscription = serde_json::from_value(object.clone())?;

        let mut price_ids: Vec<String> = raw
            .items
            .map(|items| {
                items
                    .data
                    .into_iter()
                    .filter_map(|item| item.price.map(|price| price.id))
                    .collect()
            })
            .unwrap_or_default();

        if price_ids.is_empty() {
            if let Some(plan) = raw.plan {
                price_ids.push(plan.id);
            }
        }

        let (billing_customer_id, expanded_email) = match raw.customer {
            RawCustomer::Id(id) => (id, None),
            RawCustomer::Expanded { id, email } => (id, email),
        };

        let customer_email = raw
            .customer_email
            .or(expanded_email)
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());

        Ok(Self {
            billing_subscription_id: raw.id,
            billing_customer_id,
            status: raw.status,
            price_ids,
            customer_email,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    id: String,
    customer: RawCustomer,
    status: SubscriptionStatus,
    #[serde(default)]
    items: Option<RawItemList>,
    #[serde(default)]
    plan: Option<RawPrice>,
    #[serde(default)]
    customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCustomer {
    Id(String),
    Expanded {
        id: String,
        #[serde(default)]
        email: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawItemList {
    #[serde(default)]
    data: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    price: Option<RawPrice>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    id: String,
}
