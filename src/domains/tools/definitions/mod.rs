//! Integration definitions.
//!
//! Each integration lives in its own file and exposes an `integration()`
//! builder invoked during startup composition. Adding an integration means
//! adding a file here and listing its builder in the gateway's registration
//! list - registration is explicit, never discovered at runtime.

use std::collections::HashMap;

use crate::domains::registry::{ConfigurationIssue, ServerDescriptor};

use super::catalog::ToolCatalog;

pub mod shopify;
pub mod stripe;

/// Everything one integration contributes at startup.
pub struct IntegrationDefinition {
    pub descriptor: ServerDescriptor,
    pub catalog: ToolCatalog,

    /// Credential field name to request header name (test/internal channel).
    pub credential_headers: HashMap<String, String>,

    /// Credential field name to environment variable name (dev fallback).
    pub env_credentials: HashMap<String, String>,
}

/// Builder invoked at startup for one integration.
pub type IntegrationBuilder = fn() -> Result<IntegrationDefinition, ConfigurationIssue>;

/// The production registration list.
pub fn default_integrations() -> Vec<IntegrationBuilder> {
    vec![shopify::integration, stripe::integration]
}

/// JSON Schema for a tool's parameter type.
pub fn schema_for<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| serde_json::json!({}))
}
