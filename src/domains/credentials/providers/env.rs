//! Environment-fallback credential provider.
//!
//! Lowest-priority source, for development only: fixed environment variable
//! names per integration type. Disabled unless the gateway config opts in, so
//! local defaults can never shadow tenant credentials in production.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use crate::domains::credentials::error::CredentialError;
use crate::domains::credentials::provider::{CredentialProvider, ResolveRequest};
use crate::domains::credentials::record::{CredentialMap, CredentialRecord};
use crate::domains::registry::IntegrationType;

/// Field name to environment variable name mapping for one integration type.
pub type EnvFieldMap = HashMap<String, String>;

/// Reads credentials from fixed environment variables.
pub struct EnvCredentialProvider {
    enabled: bool,
    mappings: HashMap<IntegrationType, EnvFieldMap>,
}

impl EnvCredentialProvider {
    pub fn new(enabled: bool, mappings: HashMap<IntegrationType, EnvFieldMap>) -> Self {
        Self { enabled, mappings }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        if !self.enabled {
            return Ok(None);
        }

        let Some(mapping) = self.mappings.get(&request.integration_type) else {
            return Ok(None);
        };

        let mut fields = CredentialMap::new();
        for field in &request.required_fields {
            let Some(var) = mapping.get(field) else {
                return Ok(None);
            };
            match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => {
                    fields.insert(field.clone(), value);
                }
                _ => {
                    debug!(field, var, "environment credential not set");
                    return Ok(None);
                }
            }
        }

        debug!(
            integration_type = %request.integration_type,
            "using development environment credentials"
        );

        Ok(Some(CredentialRecord::new(
            request.organization_id.clone(),
            request.integration_type.clone(),
            fields,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn provider(enabled: bool) -> EnvCredentialProvider {
        let mut payments = EnvFieldMap::new();
        payments.insert("apiKey".into(), "GATEWAY_TEST_STRIPE_API_KEY".into());
        let mut mappings = HashMap::new();
        mappings.insert("payments".into(), payments);
        EnvCredentialProvider::new(enabled, mappings)
    }

    fn request() -> ResolveRequest {
        ResolveRequest::new("org_1", "payments".into(), vec!["apiKey".into()])
    }

    #[tokio::test]
    async fn test_reads_env_when_enabled() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("GATEWAY_TEST_STRIPE_API_KEY", "sk_test_env");
        }

        let record = provider(true).resolve(&request()).await.unwrap().unwrap();
        assert_eq!(record.get("apiKey"), Some("sk_test_env"));

        unsafe {
            std::env::remove_var("GATEWAY_TEST_STRIPE_API_KEY");
        }
    }

    #[tokio::test]
    async fn test_disabled_never_resolves() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("GATEWAY_TEST_STRIPE_API_KEY", "sk_test_env");
        }

        let result = provider(false).resolve(&request()).await.unwrap();
        assert!(result.is_none());

        unsafe {
            std::env::remove_var("GATEWAY_TEST_STRIPE_API_KEY");
        }
    }

    #[tokio::test]
    async fn test_unset_variable_falls_through() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::remove_var("GATEWAY_TEST_STRIPE_API_KEY");
        }

        let result = provider(true).resolve(&request()).await.unwrap();
        assert!(result.is_none());
    }
}
