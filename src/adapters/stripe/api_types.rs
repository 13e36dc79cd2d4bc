//! Stripe API response types.
//!
//! These mirror the subset of Stripe's JSON the adapter reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ports::BillingCustomer;

/// Stripe customer object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCustomer {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Set on the stub Stripe returns for deleted customers.
    #[serde(default)]
    pub deleted: bool,
}

impl StripeCustomer {
    /// Converts to the port type; deleted customers have no counterpart.
    pub fn into_billing_customer(self) -> Option<BillingCustomer> {
        if self.deleted {
            return None;
        }
        Some(BillingCustomer {
            id: self.id,
            email: self.email.filter(|e| !e.trim().is_empty()),
            metadata: self.metadata,
        })
    }
}

/// Stripe list or search result envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

/// Error body returned by the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

/// Builds a Customer Search query matching one metadata value.
///
/// Single quotes and backslashes in the value are escaped per the search
/// query language.
pub fn metadata_search_query(key: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("metadata['{}']:'{}'", key, escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_customer_with_metadata() {
        let json = r#"{
            "id": "cus_123",
            "object": "customer",
            "email": "member@example.com",
            "metadata": {"internal_customer_id": "42"}
        }"#;

        let customer: StripeCustomer = serde_json::from_str(json).unwrap();
        let billing = customer.into_billing_customer().unwrap();

        assert_eq!(billing.id, "cus_123");
        assert_eq!(billing.internal_customer_id(), Some("42"));
    }

    #[test]
    fn deleted_customer_has_no_billing_counterpart() {
        let json = r#"{"id": "cus_123", "object": "customer", "deleted": true}"#;

        let customer: StripeCustomer = serde_json::from_str(json).unwrap();

        assert!(customer.into_billing_customer().is_none());
    }

    #[test]
    fn deserializes_list_envelope() {
        let json = r#"{"object": "list", "data": [{"id": "cus_1"}, {"id": "cus_2"}], "has_more": false}"#;

        let list: StripeList<StripeCustomer> = serde_json::from_str(json).unwrap();

        assert_eq!(list.data.len(), 2);
        assert!(!list.has_more);
    }

    #[test]
    fn deserializes_error_body() {
        let json = r#"{"error": {"code": "resource_missing", "message": "No such customer", "type": "invalid_request_error"}}"#;

        let body: StripeErrorBody = serde_json::from_str(json).unwrap();

        assert_eq!(body.error.code.as_deref(), Some("resource_missing"));
        assert_eq!(body.error.error_type.as_deref(), Some("invalid_request_error"));
    }

    #[test]
    fn metadata_search_query_escapes_quotes() {
        assert_eq!(
            metadata_search_query("internal_customer_id", "42"),
            "metadata['internal_customer_id']:'42'"
        );
        assert_eq!(
            metadata_search_query("k", "o'brien"),
            "metadata['k']:'o\\'brien'"
        );
    }
}
