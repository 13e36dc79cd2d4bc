//! Membership Reconciler - Subscription Entitlement Reconciliation
//!
//! Receives billing-provider subscription webhooks, maps the billing customer
//! to a commerce customer, classifies the subscription into a membership
//! tier, and converges the customer's tier groups and tier field to match.

pub mod adapters;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
