//! Stripe webhook event types.
//!
//! Defines the structures for parsing Stripe webhook payloads.
//! Only fields relevant to our processing are captured.

use serde::{Deserialize, Serialize};

/// Stripe webhook event (simplified).
///
/// Contains the essential fields needed for webhook processing.
/// Additional fields from Stripe's full event schema are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> SubscriptionEventType {
        SubscriptionEventType::parse(&self.event_type)
    }
}

/// Subscription lifecycle events the reconciler monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEventType {
    /// `customer.subscription.created`
    Created,
    /// `customer.subscription.updated`
    Updated,
    /// `customer.subscription.deleted`
    Deleted,
    /// Anything else; acknowledged without work.
    Unmonitored,
}

impl SubscriptionEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::Created,
            "customer.subscription.updated" => Self::Updated,
            "customer.subscription.deleted" => Self::Deleted,
            _ => Self::Unmonitored,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "customer.subscription.created",
            Self::Updated => "customer.subscription.updated",
            Self::Deleted => "customer.subscription.deleted",
            Self::Unmonitored => "unmonitored",
        }
    }

    /// Returns true for the three subscription lifecycle events.
    pub fn is_monitored(&self) -> bool {
        !matches!(self, Self::Unmonitored)
    }

    /// Returns true if the subscription no longer exists at the provider.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "customer.subscription.updated".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: StripeEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: self.livemode,
            api_version: Some("2023-08-16".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_monitored_event_types() {
        assert_eq!(
            SubscriptionEventType::parse("customer.subscription.created"),
            SubscriptionEventType::Created
        );
        assert_eq!(
            SubscriptionEventType::parse("customer.subscription.updated"),
            SubscriptionEventType::Updated
        );
        assert_eq!(
            SubscriptionEventType::parse("customer.subscription.deleted"),
            SubscriptionEventType::Deleted
        );
    }

    #[test]
    fn other_event_types_are_unmonitored() {
        let parsed = SubscriptionEventType::parse("invoice.paid");
        assert_eq!(parsed, SubscriptionEventType::Unmonitored);
        assert!(!parsed.is_monitored());
    }

    #[test]
    fn only_deleted_is_deletion() {
        assert!(SubscriptionEventType::Deleted.is_deletion());
        assert!(!SubscriptionEventType::Updated.is_deletion());
        assert!(!SubscriptionEventType::Created.is_deletion());
    }

    #[test]
    fn deserializes_event_envelope_without_api_version() {
        let json = r#"{
            "id": "evt_1",
            "type": "customer.subscription.created",
            "created": 1704067200,
            "data": { "object": { "id": "sub_1" } },
            "livemode": false,
            "api_version": null
        }"#;

        let event: StripeEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.parsed_type(), SubscriptionEventType::Created);
        assert!(event.api_version.is_none());
        assert!(!event.is_live());
    }

    #[test]
    fn builder_produces_event_with_object() {
        let event = StripeEventBuilder::new()
            .id("evt_built")
            .event_type("customer.subscription.deleted")
            .object(serde_json::json!({ "id": "sub_9" }))
            .livemode(true)
            .build();

        assert_eq!(event.id, "evt_built");
        assert!(event.is_live());
        assert_eq!(event.data.object["id"], "sub_9");
    }
}
