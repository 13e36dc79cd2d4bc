//! Bounded collaborator calls.
//!
//! Every call the reconciler makes to the directory, group store, or billing
//! provider goes through [`DownstreamGuard`], which applies the configured
//! timeout and tags failures with the step that made the call.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Default per-call timeout.
pub const DEFAULT_DOWNSTREAM_TIMEOUT: Duration = Duration::from_millis(5000);

/// Why a downstream call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The call did not complete within the timeout.
    Timeout { after_ms: u64 },
    /// The collaborator returned an error.
    Collaborator(String),
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            FailureKind::Collaborator(message) => write!(f, "{}", message),
        }
    }
}

/// A collaborator call that failed or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step} failed: {kind}")]
pub struct DownstreamFailure {
    /// Name of the step that made the call.
    pub step: &'static str,
    pub kind: FailureKind,
}

impl DownstreamFailure {
    pub fn new(step: &'static str, kind: FailureKind) -> Self {
        Self { step, kind }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FailureKind::Timeout { .. })
    }
}

impl From<DownstreamFailure> for DomainError {
    fn from(failure: DownstreamFailure) -> Self {
        let code = match failure.kind {
            FailureKind::Timeout { .. } => ErrorCode::Timeout,
            FailureKind::Collaborator(_) => ErrorCode::ExternalServiceError,
        };
        DomainError::new(code, failure.to_string()).with_detail("step", failure.step)
    }
}

/// Applies a timeout to collaborator calls.
#[derive(Debug, Clone, Copy)]
pub struct DownstreamGuard {
    timeout: Duration,
}

impl DownstreamGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call`, mapping elapsed timeouts and errors to `DownstreamFailure`.
    pub async fn call<T, E, F>(&self, step: &'static str, call: F) -> Result<T, DownstreamFailure>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(DownstreamFailure::new(
                step,
                FailureKind::Collaborator(error.to_string()),
            )),
            Err(_) => Err(DownstreamFailure::new(
                step,
                FailureKind::Timeout {
                    after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                },
            )),
        }
    }
}

impl Default for DownstreamGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNSTREAM_TIMEOUT)
    }
}
