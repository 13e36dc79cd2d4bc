//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` trait against the Stripe REST API.
//! Requests are form-encoded and authenticated with the secret key via
//! HTTP basic auth.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_timeout(Duration::from_secs(5));
//! let adapter = StripeBillingAdapter::new(config)?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::membership::SubscriptionSnapshot;
use crate::ports::{BillingCustomer, BillingProvider, PaymentError, PaymentErrorCode};

use super::api_types::{metadata_search_query, StripeCustomer, StripeErrorBody, StripeList};

/// Default Stripe API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Subscriptions fetched per customer for status queries.
const SUBSCRIPTION_PAGE_SIZE: &str = "10";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Per-request timeout enforced by the HTTP client.
    timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stripe billing provider adapter.
pub struct StripeBillingAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeBillingAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
    }

    /// Sends a request, treating 404 as `None`.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<Option<T>, PaymentError> {
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(error_from_response(response, operation).await);
        }

        response.json::<T>().await.map(Some).map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse Stripe response: {}", e))
        })
    }

    /// Sends a request where 404 is an error.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T, PaymentError> {
        self.send_optional(request, operation)
            .await?
            .ok_or_else(|| PaymentError::not_found("Stripe resource"))
    }
}

/// Maps a non-success Stripe response to a `PaymentError`.
async fn error_from_response(response: reqwest::Response, operation: &'static str) -> PaymentError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<StripeErrorBody>(&body).ok().map(|b| b.error);

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        400..=499 => PaymentErrorCode::InvalidRequest,
        500..=599 => PaymentErrorCode::ProviderError,
        _ => PaymentErrorCode::Unknown,
    };

    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    tracing::error!(
        operation,
        status = status.as_u16(),
        error = %message,
        "Stripe API request failed"
    );

    let mut error = PaymentError::new(code, format!("Stripe API error: {}", message));
    if let Some(provider_code) = detail.and_then(|d| d.code.or(d.error_type)) {
        error = error.with_provider_code(provider_code);
    }
    error
}

#[async_trait]
impl BillingProvider for StripeBillingAdapter {
    async fn retrieve_customer(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError> {
        let customer: Option<StripeCustomer> = self
            .send_optional(
                self.get(&format!("/v1/customers/{}", billing_customer_id)),
                "retrieve_customer",
            )
            .await?;

        Ok(customer.and_then(StripeCustomer::into_billing_customer))
    }

    async fn update_customer_metadata(
        &self,
        billing_customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), PaymentError> {
        let params: Vec<(String, String)> = metadata
            .into_iter()
            .map(|(key, value)| (format!("metadata[{}]", key), value))
            .collect();

        let _: StripeCustomer = self
            .send(
                self.post(&format!("/v1/customers/{}", billing_customer_id))
                    .form(&params),
                "update_customer_metadata",
            )
            .await?;

        Ok(())
    }

    async fn find_customer_by_metadata(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError> {
        let query = metadata_search_query(key, value);
        let list: StripeList<StripeCustomer> = self
            .send(
                self.get("/v1/customers/search")
                    .query(&[("query", query.as_str()), ("limit", "1")]),
                "find_customer_by_metadata",
            )
            .await?;

        Ok(list
            .data
            .into_iter()
            .find_map(StripeCustomer::into_billing_customer))
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<BillingCustomer>, PaymentError> {
        let list: StripeList<StripeCustomer> = self
            .send(
                self.get("/v1/customers")
                    .query(&[("email", email), ("limit", "1")]),
                "find_customer_by_email",
            )
            .await?;

        Ok(list
            .data
            .into_iter()
            .find_map(StripeCustomer::into_billing_customer))
    }

    async fn list_subscriptions(
        &self,
        billing_customer_id: &str,
    ) -> Result<Vec<SubscriptionSnapshot>, PaymentError> {
        let list: StripeList<serde_json::Value> = self
            .send(
                self.get("/v1/subscriptions").query(&[
                    ("customer", billing_customer_id),
                    ("status", "all"),
                    ("limit", SUBSCRIPTION_PAGE_SIZE),
                ]),
                "list_subscriptions",
            )
            .await?;

        list.data
            .iter()
            .map(|object| {
                SubscriptionSnapshot::from_stripe_object(object).map_err(|e| {
                    PaymentError::invalid_response(format!("Unexpected subscription shape: {}", e))
                })
            })
            .collect()
    }
}
