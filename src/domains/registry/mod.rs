//! Registry domain module.
//!
//! Static mapping of integration types to server descriptors, plus the
//! startup validation pass that runs before the gateway serves traffic.
//!
//! - `descriptor.rs` - `ServerDescriptor` and related value types
//! - `registry.rs` - `ServerRegistry` lookups and `validate_configuration`
//! - `error.rs` - aggregated configuration issues

mod descriptor;
mod error;
mod registry;

pub use descriptor::{IntegrationType, ServerDescriptor, ServerTransport};
pub use error::ConfigurationIssue;
pub use registry::{MAX_RETRIES, MIN_TIMEOUT_MS, ServerEntry, ServerRegistry};
