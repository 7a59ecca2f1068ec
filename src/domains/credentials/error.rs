//! Credential resolution errors.

use thiserror::Error;

/// Errors surfaced by the credential chain and its providers.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// The chain exhausted with no provider returning any credentials.
    /// The integration is not configured for this tenant - distinct from
    /// credentials that exist but are incomplete.
    #[error("integration not configured")]
    NotConfigured,

    /// A provider resolved a record but required fields were missing.
    /// Partial results are never merged across providers.
    #[error("credentials missing required fields: {}", missing.join(", "))]
    Invalid { missing: Vec<String> },

    /// A provider failed internally; the chain logs this and continues.
    #[error("credential provider `{provider}` failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The integration record store was unreachable or returned bad data.
    #[error("integration store error: {0}")]
    Store(String),

    /// A sealed record could not be opened with the organization key.
    #[error("credential decryption failed: {0}")]
    Cipher(String),
}

impl CredentialError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn cipher(msg: impl Into<String>) -> Self {
        Self::Cipher(msg.into())
    }
}
