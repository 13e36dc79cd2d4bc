//! Webhook error types for Stripe webhook handling.
//!
//! Signature failures are the only webhook errors the provider ever sees;
//! everything after verification is absorbed by the dispatcher.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that reject an inbound webhook before any processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// No Stripe-Signature header and unsigned test pings are disabled.
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    /// Request body was empty.
    #[error("Missing raw request body")]
    MissingBody,

    /// Signature header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No v1 signature matched the expected HMAC.
    #[error("No signatures found matching the expected signature for payload")]
    NoMatchingSignature,

    /// Timestamp older than the tolerance window.
    #[error("Timestamp outside the tolerance zone ({age_secs}s old)")]
    TimestampExpired { age_secs: i64 },

    /// Timestamp further in the future than clock skew allows.
    #[error("Timestamp is in the future")]
    TimestampInFuture,

    /// Signed body is not a valid event envelope.
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),
}

impl SignatureError {
    /// Maps the error to an HTTP status code.
    ///
    /// All signature failures are client errors so Stripe does not retry.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Short machine-readable reason used in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            SignatureError::MissingHeader => "missing_header",
            SignatureError::MissingBody => "missing_body",
            SignatureError::MalformedHeader(_) => "malformed_header",
            SignatureError::NoMatchingSignature => "no_matching_signature",
            SignatureError::TimestampExpired { .. } => "timestamp_expired",
            SignatureError::TimestampInFuture => "timestamp_in_future",
            SignatureError::MalformedPayload(_) => "malformed_payload",
        }
    }
}
