//! Transport layer for the gateway.
//!
//! The gateway is served over HTTP with JSON-RPC over POST, one endpoint per
//! registered server. The transport handles connection lifecycle, header
//! parsing, and attribution-context setup, and delegates everything else to
//! the gateway dispatcher.

mod config;
mod error;

pub mod http;

pub use config::HttpConfig;
pub use error::{TransportError, TransportResult};
