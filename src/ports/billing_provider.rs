//! Billing provider port.
//!
//! Defines the contract for the billing-provider API (Stripe). The
//! reconciler only reads customers and subscriptions and writes customer
//! metadata; it never creates charges or subscriptions.
//!
//! # Design
//!
//! - **Lookups return `Option`**: an unknown customer is not an error
//! - **Metadata writes merge**: keys not named are left untouched

use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::membership::SubscriptionSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata key on the billing customer holding the internal customer id.
pub const INTERNAL_CUSTOMER_ID_KEY: &str = "internal_customer_id";

/// Port for billing provider integrations.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Get customer by provider ID.
    ///
    /// Returns `None` for unknown or deleted customers.
    async fn retrieve_customer(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError>;

    /// Merge key/value pairs into the customer's metadata.
    async fn update_customer_metadata(
        &self,
        billing_customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), PaymentError>;

    /// Find the first customer whose metadata `key` equals `value`.
    async fn find_customer_by_metadata(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError>;

    /// Find the first customer with the given email.
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError>;

    /// List the customer's subscriptions, most recent first.
    async fn list_subscriptions(
        &self,
        billing_customer_id: &str,
    ) -> Result<Vec<SubscriptionSnapshot>, PaymentError>;
}

/// Customer in the billing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCustomer {
    /// Provider's customer ID.
    pub id: String,

    /// Customer email.
    pub email: Option<String>,

    /// Provider-side metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl BillingCustomer {
    /// Internal customer id recorded by a previous resolution, if any.
    pub fn internal_customer_id(&self) -> Option<&str> {
        self.metadata
            .get(INTERNAL_CUSTOMER_ID_KEY)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }
}

/// Errors from billing provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create an error for a response body that could not be decoded.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::CustomerNotFound,
            _ => ErrorCode::ExternalServiceError,
        };

        let mut domain = DomainError::new(code, err.message);
        if let Some(provider_code) = err.provider_code {
            domain = domain.with_detail("provider_code", provider_code);
        }
        domain
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Request rejected as invalid by the provider.
    InvalidRequest,

    /// Response body did not match the expected shape.
    InvalidResponse,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::InvalidResponse => "invalid_response",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
