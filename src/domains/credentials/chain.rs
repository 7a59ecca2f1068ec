//! Composite credential chain.
//!
//! Providers are tried strictly in priority order; the first fully-validated
//! result wins and short-circuits the rest. The order is a trust hierarchy:
//! narrowly-scoped tokens beat stored tenant secrets, which beat ambient
//! request headers, which beat development environment defaults.

use std::sync::Arc;
use tracing::{debug, warn};

use super::cache::CredentialCache;
use super::error::CredentialError;
use super::provider::{CredentialProvider, ResolveRequest};
use super::record::CredentialRecord;

/// Ordered fallback chain over credential providers.
pub struct CredentialChain {
    providers: Vec<Arc<dyn CredentialProvider>>,
    cache: Option<Arc<CredentialCache>>,
}

impl CredentialChain {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        Self {
            providers,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CredentialCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve one validated credential record.
    ///
    /// Exactly one provider's result is used; partial maps are discarded,
    /// never merged with later providers. Provider failures are logged and
    /// the chain continues. Exhaustion yields `NotConfigured`, unless some
    /// provider produced a partial record, in which case the caller gets
    /// `Invalid` with the missing fields - the two are distinct signals.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<CredentialRecord, CredentialError> {
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&request.organization_id, &request.integration_type)
        {
            debug!(
                organization_id = %request.organization_id,
                integration_type = %request.integration_type,
                "credential cache hit"
            );
            return Ok(hit);
        }

        let mut partial_missing: Option<Vec<String>> = None;

        for provider in &self.providers {
            match provider.resolve(request).await {
                Ok(Some(record)) => {
                    let missing = record.missing_fields(&request.required_fields);
                    if missing.is_empty() {
                        debug!(
                            provider = provider.name(),
                            organization_id = %request.organization_id,
                            integration_type = %request.integration_type,
                            "credentials resolved"
                        );
                        if let Some(cache) = &self.cache {
                            cache.put(record.clone());
                        }
                        return Ok(record);
                    }

                    warn!(
                        provider = provider.name(),
                        integration_type = %request.integration_type,
                        missing = ?missing,
                        "provider returned partial credentials; discarding"
                    );
                    // Keep the highest-priority partial for the error signal.
                    partial_missing.get_or_insert(missing);
                }
                Ok(None) => {
                    debug!(provider = provider.name(), "provider not applicable");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "credential provider failed; continuing chain"
                    );
                }
            }
        }

        match partial_missing {
            Some(missing) => Err(CredentialError::Invalid { missing }),
            None => Err(CredentialError::NotConfigured),
        }
    }

    /// Invalidate any cached credentials for a tenant/integration pair.
    pub fn invalidate(
        &self,
        organization_id: &str,
        integration_type: &crate::domains::registry::IntegrationType,
    ) {
        if let Some(cache) = &self.cache {
            cache.invalidate(organization_id, integration_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::credentials::record::CredentialMap;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider for chain-order tests.
    struct Scripted {
        name: &'static str,
        result: ScriptedResult,
        calls: AtomicUsize,
    }

    enum ScriptedResult {
        None,
        Fields(Vec<(&'static str, &'static str)>),
        Fail,
    }

    impl Scripted {
        fn new(name: &'static str, result: ScriptedResult) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialProvider for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn resolve(
            &self,
            request: &ResolveRequest,
        ) -> Result<Option<CredentialRecord>, CredentialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                ScriptedResult::None => Ok(None),
                ScriptedResult::Fail => Err(CredentialError::provider(self.name, "scripted")),
                ScriptedResult::Fields(pairs) => {
                    let mut fields = CredentialMap::new();
                    for (k, v) in pairs {
                        fields.insert((*k).into(), (*v).into());
                    }
                    Ok(Some(CredentialRecord::new(
                        request.organization_id.clone(),
                        request.integration_type.clone(),
                        fields,
                    )))
                }
            }
        }
    }

    fn request() -> ResolveRequest {
        ResolveRequest::new("org_1", "shopify".into(), vec!["apiKey".into()])
    }

    #[tokio::test]
    async fn test_first_valid_short_circuits() {
        let a = Scripted::new("a", ScriptedResult::None);
        let b = Scripted::new("b", ScriptedResult::Fields(vec![("apiKey", "from-b")]));
        let c = Scripted::new("c", ScriptedResult::Fields(vec![("apiKey", "from-c")]));

        let chain = CredentialChain::new(vec![a.clone(), b.clone(), c.clone()]);
        let record = chain.resolve(&request()).await.unwrap();

        assert_eq!(record.get("apiKey"), Some("from-b"));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 0, "later providers must be skipped");
    }

    #[tokio::test]
    async fn test_provider_failure_continues_chain() {
        let a = Scripted::new("a", ScriptedResult::Fail);
        let b = Scripted::new("b", ScriptedResult::Fields(vec![("apiKey", "from-b")]));

        let chain = CredentialChain::new(vec![a, b]);
        let record = chain.resolve(&request()).await.unwrap();
        assert_eq!(record.get("apiKey"), Some("from-b"));
    }

    #[tokio::test]
    async fn test_exhaustion_is_not_configured() {
        let chain = CredentialChain::new(vec![
            Scripted::new("a", ScriptedResult::None),
            Scripted::new("b", ScriptedResult::None),
        ]);

        let err = chain.resolve(&request()).await.unwrap_err();
        assert!(matches!(err, CredentialError::NotConfigured));
    }

    #[tokio::test]
    async fn test_partial_result_reports_invalid_not_merged() {
        // First provider has the wrong field, second has nothing; the partial
        // must not merge and the error must name the missing field.
        let a = Scripted::new("a", ScriptedResult::Fields(vec![("shopDomain", "x")]));
        let b = Scripted::new("b", ScriptedResult::None);

        let chain = CredentialChain::new(vec![a, b]);
        let err = chain.resolve(&request()).await.unwrap_err();
        match err {
            CredentialError::Invalid { missing } => {
                assert_eq!(missing, vec!["apiKey".to_string()]);
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_skips_providers_on_hit() {
        let a = Scripted::new("a", ScriptedResult::Fields(vec![("apiKey", "cached")]));
        let cache = Arc::new(CredentialCache::new(std::time::Duration::from_secs(60)));
        let chain = CredentialChain::new(vec![a.clone()]).with_cache(cache);

        chain.resolve(&request()).await.unwrap();
        chain.resolve(&request()).await.unwrap();
        assert_eq!(a.call_count(), 1, "second call should hit the cache");

        chain.invalidate("org_1", &"shopify".into());
        chain.resolve(&request()).await.unwrap();
        assert_eq!(a.call_count(), 2);
    }
}
