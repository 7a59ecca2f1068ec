//! Persistent-store credential provider.
//!
//! Second in the chain: looks up the tenant's active integration record and
//! opens it with the organization-scoped cipher. Absence of an active record
//! is a fall-through, not an error.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domains::credentials::error::CredentialError;
use crate::domains::credentials::provider::{CredentialProvider, ResolveRequest};
use crate::domains::credentials::record::CredentialRecord;
use crate::domains::credentials::store::{CredentialCipher, IntegrationStore};

/// Resolves credentials from the persistent integration record store.
pub struct StoreCredentialProvider {
    store: Arc<dyn IntegrationStore>,
    cipher: Arc<dyn CredentialCipher>,
}

impl StoreCredentialProvider {
    pub fn new(store: Arc<dyn IntegrationStore>, cipher: Arc<dyn CredentialCipher>) -> Self {
        Self { store, cipher }
    }
}

#[async_trait]
impl CredentialProvider for StoreCredentialProvider {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        if request.organization_id.is_empty() {
            return Ok(None);
        }

        let Some(sealed) = self
            .store
            .active_integration(&request.organization_id, &request.integration_type)
            .await?
        else {
            debug!(
                organization_id = %request.organization_id,
                integration_type = %request.integration_type,
                "no active integration record"
            );
            return Ok(None);
        };

        let fields = self.cipher.open(&request.organization_id, &sealed.payload)?;

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
    use crate::domains::credentials::record::CredentialMap;
    use crate::domains::credentials::store::{MemoryIntegrationStore, PlainCipher};

    fn provider_with(store: MemoryIntegrationStore) -> StoreCredentialProvider {
        StoreCredentialProvider::new(Arc::new(store), Arc::new(PlainCipher))
    }

    #[tokio::test]
    async fn test_resolves_active_record() {
        let store = MemoryIntegrationStore::new();
        let mut fields = CredentialMap::new();
        fields.insert("apiKey".into(), "sk_live_1".into());
        store.insert_fields("org_1", "payments".into(), &fields);

        let request = ResolveRequest::new("org_1", "payments".into(), vec!["apiKey".into()]);
        let record = provider_with(store).resolve(&request).await.unwrap().unwrap();
        assert_eq!(record.get("apiKey"), Some("sk_live_1"));
        assert_eq!(record.organization_id(), "org_1");
    }

    #[tokio::test]
    async fn test_missing_record_falls_through() {
        let request = ResolveRequest::new("org_2", "payments".into(), vec!["apiKey".into()]);
        let result = provider_with(MemoryIntegrationStore::new())
            .resolve(&request)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_anonymous_request_falls_through() {
        let request = ResolveRequest::new("", "payments".into(), vec!["apiKey".into()]);
        let result = provider_with(MemoryIntegrationStore::new())
            .resolve(&request)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
