//! Resolved customer identity.

use serde::Serialize;

use crate::domain::foundation::CustomerId;

/// Which step of the resolution chain matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Directory record already linked to the billing customer.
    CachedMapping,
    /// Internal id stored in the billing customer's metadata.
    BillingMetadata,
    /// Email match, after which the mapping is written back.
    Email,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::CachedMapping => "cached_mapping",
            ResolutionSource::BillingMetadata => "billing_metadata",
            ResolutionSource::Email => "email",
        }
    }

    /// True when the match did not come from a stored mapping.
    pub fn needs_write_back(&self) -> bool {
        matches!(self, ResolutionSource::Email)
    }
}

/// The internal customer a billing event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerIdentity {
    pub customer_id: CustomerId,
    pub billing_customer_id: Option<String>,
    pub email: String,
    pub resolved_via: ResolutionSource,
}
