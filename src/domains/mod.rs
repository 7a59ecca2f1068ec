//! Domains module containing business logic organized by bounded contexts.
//!
//! Each subdomain covers one concern of the gateway: the static server
//! registry, per-tenant credential resolution, tool catalogs and dispatch,
//! and usage attribution.

pub mod credentials;
pub mod registry;
pub mod tools;
pub mod usage;
