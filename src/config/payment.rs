//! Payment configuration

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::stripe::{StripeConfig, DEFAULT_API_BASE_URL};
use crate::domain::membership::{SignatureVerifier, DEFAULT_TOLERANCE};

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Maximum signature age in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: u64,

    /// Accept deliveries with no signature header as test pings
    #[serde(default)]
    pub allow_unsigned_test_ping: bool,

    /// Override for the Stripe API base URL
    #[serde(default)]
    pub stripe_api_base_url: Option<String>,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn signature_tolerance(&self) -> Duration {
        Duration::from_secs(self.signature_tolerance_secs)
    }

    /// Webhook verifier for the configured secret and tolerance.
    pub fn signature_verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.stripe_webhook_secret.clone(), self.signature_tolerance())
            .allow_unsigned_test_ping(self.allow_unsigned_test_ping)
    }

    /// Stripe API client settings.
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(self.stripe_api_key.clone()).with_base_url(
            self.stripe_api_base_url
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
        )
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }

        // Secret keys and restricted keys only
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.signature_tolerance_secs == 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }

        Ok(())
    }
}

fn default_signature_tolerance() -> u64 {
    DEFAULT_TOLERANCE.as_secs()
}
