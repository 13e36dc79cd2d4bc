//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum routes for webhooks and membership queries
//! - `memory` - in-process directory and group store
//! - `postgres` - commerce store tables
//! - `stripe` - billing provider API client and mock

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use memory::{InMemoryCustomerDirectory, InMemoryGroupMembership};
pub use postgres::{PostgresCustomerDirectory, PostgresGroupMembership};
pub use stripe::{MockBillingProvider, StripeBillingAdapter, StripeConfig};
