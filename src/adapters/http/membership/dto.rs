//! HTTP DTOs (Data Transfer Objects) for membership endpoints.
//!
//! These types define the JSON response structure for the webhook
//! acknowledgement and the membership read endpoints.

use crate::application::handlers::membership::{CustomerGroupsView, MembershipStatusView};
use crate::domain::membership::{MembershipTier, SubscriptionStatus};
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned for every authentic webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Live membership status for a customer.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipStatusResponse {
    pub customer_id: String,
    pub tier: MembershipTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
}

impl From<MembershipStatusView> for MembershipStatusResponse {
    fn from(view: MembershipStatusView) -> Self {
        Self {
            customer_id: view.customer_id.to_string(),
            tier: view.tier,
            billing_customer_id: view.billing_customer_id,
            subscription_status: view.subscription_status,
            price_id: view.price_id,
        }
    }
}

/// Tier groups a customer belongs to, plus the stored tier field.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerGroupsResponse {
    pub customer_id: String,
    pub groups: Vec<String>,
    pub tier: MembershipTier,
}

impl From<CustomerGroupsView> for CustomerGroupsResponse {
    fn from(view: CustomerGroupsView) -> Self {
        Self {
            customer_id: view.customer_id.to_string(),
            groups: view.groups.iter().map(|g| g.to_string()).collect(),
            tier: view.tier,
        }
    }
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CustomerId, GroupId};

    #[test]
    fn webhook_ack_serializes_received_true() {
        let json = serde_json::to_value(WebhookAck::received()).unwrap();
        assert_eq!(json, serde_json::json!({"received": true}));
    }

    #[test]
    fn status_response_omits_absent_billing_fields() {
        let view = MembershipStatusView {
            customer_id: CustomerId::new("7").unwrap(),
            tier: MembershipTier::None,
            billing_customer_id: None,
            subscription_status: None,
            price_id: None,
        };

        let json = serde_json::to_value(MembershipStatusResponse::from(view)).unwrap();

        assert_eq!(json, serde_json::json!({"customer_id": "7", "tier": "none"}));
    }

    #[test]
    fn status_response_includes_subscription_details() {
        let view = MembershipStatusView {
            customer_id: CustomerId::new("7").unwrap(),
            tier: MembershipTier::Premium,
            billing_customer_id: Some("cus_1".to_string()),
            subscription_status: Some(SubscriptionStatus::Active),
            price_id: Some("price_premium".to_string()),
        };

        let json = serde_json::to_value(MembershipStatusResponse::from(view)).unwrap();

        assert_eq!(json["tier"], "premium");
        assert_eq!(json["subscription_status"], "active");
        assert_eq!(json["billing_customer_id"], "cus_1");
    }

    #[test]
    fn groups_response_lists_group_ids() {
        let view = CustomerGroupsView {
            customer_id: CustomerId::new("7").unwrap(),
            groups: vec![GroupId::new("10").unwrap()],
            tier: MembershipTier::Basic,
        };

        let json = serde_json::to_value(CustomerGroupsResponse::from(view)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"customer_id": "7", "groups": ["10"], "tier": "basic"})
        );
    }

    #[test]
    fn error_response_serializes_without_details_when_none() {
        let response = ErrorResponse::new("CUSTOMER_NOT_FOUND", "Customer not found");
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn error_response_with_details_includes_details() {
        let details = serde_json::json!({"step": "find_by_id"});
        let response = ErrorResponse::with_details("TIMEOUT", "timed out", details.clone());
        assert_eq!(response.details, Some(details));
    }
}
