//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 100")]
    InvalidPoolSize,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Signature tolerance must be positive")]
    InvalidSignatureTolerance,

    #[error("Unsigned test pings cannot be allowed in production")]
    TestPingInProduction,

    #[error("Invalid price mapping: {0}")]
    InvalidPriceMapping(String),

    #[error("Invalid tier groups: {0}")]
    InvalidTierGroups(String),

    #[error("Downstream timeout must be positive")]
    InvalidDownstreamTimeout,

    #[error("Dispatch deadline must be at least the downstream timeout")]
    InvalidDispatchDeadline,
}
