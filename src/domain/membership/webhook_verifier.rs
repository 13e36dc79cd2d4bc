//! Stripe webhook signature verification.
//!
//! Implements secure verification of Stripe webhook signatures using HMAC-SHA256.
//! Includes timestamp validation to prevent replay attacks.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::StripeEvent;
use super::webhook_errors::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Default replay tolerance (5 minutes).
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// Every v1 signature (HMAC-SHA256) in the header. Stripe sends more
    /// than one while a signing secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>][,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::MalformedHeader` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures: Vec<Vec<u8>> = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| malformed("invalid header format"))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| malformed("invalid timestamp"))?);
                }
                "v1" => {
                    v1_signatures
                        .push(hex::decode(value).map_err(|_| malformed("invalid v1 signature hex"))?);
                }
                _ => {
                    // v0 and unknown schemes are ignored
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| malformed("missing timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(malformed("missing v1 signature"));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

fn malformed(reason: &str) -> SignatureError {
    SignatureError::MalformedHeader(reason.to_string())
}

/// Result of authenticating an inbound delivery.
#[derive(Debug, Clone)]
pub enum Verification {
    /// Unsigned probe accepted because test pings are enabled.
    TestPing,
    /// Signature checked and payload parsed.
    Verified(StripeEvent),
}

/// Verifier for Stripe webhook signatures.
pub struct SignatureVerifier {
    /// The webhook signing secret from Stripe dashboard.
    secret: SecretString,
    /// Maximum age of a signed timestamp.
    tolerance: Duration,
    /// Accept requests that carry no signature header at all.
    allow_unsigned_test_ping: bool,
}

impl SignatureVerifier {
    /// Creates a verifier with the given secret and replay tolerance.
    ///
    /// Unsigned test pings are rejected unless enabled with
    /// [`SignatureVerifier::allow_unsigned_test_ping`].
    pub fn new(secret: SecretString, tolerance: Duration) -> Self {
        Self {
            secret,
            tolerance,
            allow_unsigned_test_ping: false,
        }
    }

    /// Enables or disables the unsigned test-ping bypass.
    pub fn allow_unsigned_test_ping(mut self, allow: bool) -> Self {
        self.allow_unsigned_test_ping = allow;
        self
    }

    /// Authenticates a delivery, honoring the test-ping bypass.
    ///
    /// The bypass applies only when the signature header is absent; a
    /// present but invalid header is always verified and rejected.
    pub fn authenticate(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<Verification, SignatureError> {
        match signature_header {
            None if self.allow_unsigned_test_ping => Ok(Verification::TestPing),
            None => Err(SignatureError::MissingHeader),
            Some(header) => self.verify(payload, header).map(Verification::Verified),
        }
    }

    /// Verifies the webhook signature against the current time and parses
    /// the event.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<StripeEvent, SignatureError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Reject an empty body
    /// 2. Parse the signature header
    /// 3. Compare each v1 signature with the expected HMAC (constant-time)
    /// 4. Validate timestamp is within the tolerance window
    /// 5. Parse the JSON payload into a StripeEvent
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent, SignatureError> {
        if payload.is_empty() {
            return Err(SignatureError::MissingBody);
        }

        let header = SignatureHeader::parse(signature_header)?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(SignatureError::NoMatchingSignature);
        }

        self.validate_timestamp(header.timestamp, now)?;

        serde_json::from_slice(payload).map_err(|e| SignatureError::MalformedPayload(e.to_string()))
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), SignatureError> {
        let age = now - timestamp;
        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);

        if age > tolerance {
            return Err(SignatureError::TimestampExpired { age_secs: age });
        }

        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(SignatureError::TimestampInFuture);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature over `"{timestamp}.{payload}"`.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::NoMatchingSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Builds a Stripe-Signature header value for a payload.
///
/// Used to sign deliveries in tests and local tooling.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={}", timestamp),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
