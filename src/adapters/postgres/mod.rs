//! PostgreSQL adapters - Direct access to the commerce store's tables.
//!
//! - `PostgresCustomerDirectory` - customer lookups, billing link, tier field
//! - `PostgresGroupMembership` - customer group join table

mod customer_directory;
mod group_membership;

pub use customer_directory::PostgresCustomerDirectory;
pub use group_membership::PostgresGroupMembership;
