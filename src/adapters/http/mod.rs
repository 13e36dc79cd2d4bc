//! HTTP adapters - REST API implementations.

pub mod membership;

pub use membership::membership_router;
pub use membership::MembershipAppState;
