//! In-memory commerce store adapters.
//!
//! Used when no database is configured and as the collaborators in tests.
//! Both adapters support error injection, artificial latency, and call
//! tracking.

mod customer_directory;
mod group_membership;

pub use customer_directory::InMemoryCustomerDirectory;
pub use group_membership::InMemoryGroupMembership;

use std::collections::HashMap;
use std::time::Duration;

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

/// Error injection, latency, and call log shared by the test doubles.
#[derive(Debug)]
pub(crate) struct Instrumentation<E> {
    method_errors: HashMap<String, E>,
    method_delays: HashMap<String, Duration>,
    call_log: Vec<MethodCall>,
}

impl<E> Default for Instrumentation<E> {
    fn default() -> Self {
        Self {
            method_errors: HashMap::new(),
            method_delays: HashMap::new(),
            call_log: Vec::new(),
        }
    }
}

impl<E: Clone> Instrumentation<E> {
    pub(crate) fn set_error(&mut self, method: &str, error: E) {
        self.method_errors.insert(method.to_string(), error);
    }

    pub(crate) fn set_delay(&mut self, method: &str, delay: Duration) {
        self.method_delays.insert(method.to_string(), delay);
    }

    pub(crate) fn clear_errors(&mut self) {
        self.method_errors.clear();
    }

    /// Records the call and returns the configured delay and error.
    pub(crate) fn enter(&mut self, method: &str, args: Vec<String>) -> (Option<Duration>, Option<E>) {
        self.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        (
            self.method_delays.get(method).copied(),
            self.method_errors.get(method).cloned(),
        )
    }

    pub(crate) fn calls(&self) -> Vec<MethodCall> {
        self.call_log.clone()
    }

    pub(crate) fn call_count(&self, method: &str) -> usize {
        self.call_log.iter().filter(|c| c.method == method).count()
    }

    pub(crate) fn clear_calls(&mut self) {
        self.call_log.clear();
    }
}
