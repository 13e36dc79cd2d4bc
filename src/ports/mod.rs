//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Commerce Store Ports
//!
//! - `CustomerDirectory` - Customer lookups and the denormalized tier field
//! - `GroupMembership` - Customer-group add/remove/list
//!
//! ## Billing Ports
//!
//! - `BillingProvider` - Billing customer and subscription access

mod billing_provider;
mod customer_directory;
mod group_membership;

pub use billing_provider::{
    BillingCustomer, BillingProvider, PaymentError, PaymentErrorCode, INTERNAL_CUSTOMER_ID_KEY,
};
pub use customer_directory::{CustomerDirectory, CustomerRecord};
pub use group_membership::{GroupMembership, RemovalOutcome};
