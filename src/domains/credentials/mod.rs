//! Credentials domain module.
//!
//! Per-tenant secret resolution through a prioritized fallback chain.
//! Exactly one provider's result is used per resolution; partial results are
//! never merged, and exhaustion is a distinct "not configured" signal.
//!
//! - `record.rs` - decrypted credential records (redacted `Debug`)
//! - `provider.rs` - the provider trait and per-call resolve request
//! - `chain.rs` - the ordered composite chain
//! - `cache.rs` - optional (org, integration type)-keyed TTL cache
//! - `store.rs` - integration record store and cipher collaborator seams
//! - `providers/` - the four concrete providers

mod cache;
mod chain;
mod error;
mod provider;
pub mod providers;
mod record;
mod store;

pub use cache::CredentialCache;
pub use chain::CredentialChain;
pub use error::CredentialError;
pub use provider::{CredentialProvider, ResolveRequest};
pub use record::{CredentialMap, CredentialRecord};
pub use store::{
    CredentialCipher, IntegrationStore, MemoryIntegrationStore, PlainCipher, SealedIntegration,
};
