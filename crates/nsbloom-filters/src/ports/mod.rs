//! Ports Layer - Trait boundaries between the filter and its users
//!
//! The namespace server only depends on [`MembershipFilter`], so the on-disk
//! scaling filter can be swapped for an exact set in tests.

pub mod membership;

pub use membership::MembershipFilter;
