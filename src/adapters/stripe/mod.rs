//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` port for Stripe:
//! - Customer retrieval and search
//! - Customer metadata updates (identity write-back)
//! - Subscription listing for status queries
//!
//! Webhook signature verification lives in the domain
//! (`SignatureVerifier`) since it needs no network access.
//!
//! # Security
//!
//! - The secret API key is held as `secrecy::SecretString`

mod api_types;
mod mock_billing_provider;
mod stripe_adapter;

pub use api_types::{StripeCustomer, StripeList};
pub use mock_billing_provider::MockBillingProvider;
pub use stripe_adapter::{StripeBillingAdapter, StripeConfig, DEFAULT_API_BASE_URL};
