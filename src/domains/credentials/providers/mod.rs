//! Concrete credential providers, in chain priority order.
//!
//! 1. `token` - short-lived signed tokens bound to (org, integration type)
//! 2. `store` - the tenant's persisted integration record
//! 3. `headers` - fixed per-field request headers (test/internal channel)
//! 4. `env` - fixed environment variables (development only)

mod env;
mod headers;
mod store;
mod token;

pub use env::{EnvCredentialProvider, EnvFieldMap};
pub use headers::{HeaderCredentialProvider, HeaderFieldMap};
pub use store::StoreCredentialProvider;
pub use token::TokenCredentialProvider;
