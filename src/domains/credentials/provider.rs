//! Credential provider interface.
//!
//! Each provider is one source in the prioritized fallback chain. A provider
//! either resolves a full record, declares itself not applicable (`None`), or
//! fails; the chain decides what happens next.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domains::registry::IntegrationType;

use super::error::CredentialError;
use super::record::CredentialRecord;

/// Per-call snapshot handed to every provider.
///
/// Providers never reach into ambient request state; everything they may
/// consult is captured here by the transport layer.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Tenant the resolution is scoped to. May be empty for anonymous
    /// requests, in which case tenant-scoped providers return nothing.
    pub organization_id: String,

    /// Integration type being resolved.
    pub integration_type: IntegrationType,

    /// Fields the target server requires.
    pub required_fields: Vec<String>,

    /// Lower-cased header name to value snapshot from the inbound request.
    pub headers: HashMap<String, String>,

    /// Short-lived signed credential token, when the request carried one.
    pub credential_token: Option<String>,
}

impl ResolveRequest {
    pub fn new(
        organization_id: impl Into<String>,
        integration_type: IntegrationType,
        required_fields: Vec<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            integration_type,
            required_fields,
            headers: HashMap::new(),
            credential_token: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.credential_token = Some(token.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// One source of credentials in the fallback chain.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Stable provider name for logs.
    fn name(&self) -> &'static str;

    /// Attempt to resolve credentials for the request.
    ///
    /// `Ok(None)` means "not applicable here, fall through"; an error is
    /// logged by the chain and the next provider is tried.
    async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<Option<CredentialRecord>, CredentialError>;
}
