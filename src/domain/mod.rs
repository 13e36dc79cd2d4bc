//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors)
//! - `membership` - Tiers, subscription snapshots, classification and
//!   webhook signature verification

pub mod foundation;
pub mod membership;
