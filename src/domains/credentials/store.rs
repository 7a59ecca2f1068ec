//! Integration record store collaborator.
//!
//! The persistent store that holds tenant integration records is owned by the
//! integration-management subsystem; the gateway only reads from it. Records
//! arrive sealed and are opened with an organization-scoped cipher, so the
//! plaintext exists only for the duration of a resolution call.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domains::registry::IntegrationType;

use super::error::CredentialError;
use super::record::CredentialMap;

/// A tenant's stored integration record, still sealed.
#[derive(Debug, Clone)]
pub struct SealedIntegration {
    pub integration_type: IntegrationType,

    /// Sealed field map; opened by a [`CredentialCipher`].
    pub payload: String,

    /// Inactive records are invisible to the gateway.
    pub active: bool,
}

/// Read-only view of the persistent integration store.
#[async_trait]
pub trait IntegrationStore: Send + Sync {
    /// The tenant's active record for an integration type, if any.
    async fn active_integration(
        &self,
        organization_id: &str,
        integration_type: &IntegrationType,
    ) -> Result<Option<SealedIntegration>, CredentialError>;
}

/// Opens sealed credential payloads with an organization-scoped key.
///
/// The actual encryption scheme belongs to the store collaborator; the
/// gateway only needs this seam.
pub trait CredentialCipher: Send + Sync {
    fn open(
        &self,
        organization_id: &str,
        payload: &str,
    ) -> Result<CredentialMap, CredentialError>;
}

/// Base64-encoded JSON "cipher" for development and tests.
pub struct PlainCipher;

impl PlainCipher {
    /// Seal a field map the way [`open`](CredentialCipher::open) expects.
    pub fn seal(fields: &CredentialMap) -> String {
        let json = serde_json::to_vec(fields).expect("field map serializes");
        BASE64.encode(json)
    }
}

impl CredentialCipher for PlainCipher {
    fn open(
        &self,
        _organization_id: &str,
        payload: &str,
    ) -> Result<CredentialMap, CredentialError> {
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| CredentialError::cipher(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| CredentialError::cipher(e.to_string()))
    }
}

/// In-memory store for development and tests.
#[derive(Default)]
pub struct MemoryIntegrationStore {
    records: RwLock<HashMap<(String, IntegrationType), SealedIntegration>>,
}

impl MemoryIntegrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, organization_id: impl Into<String>, record: SealedIntegration) {
        let key = (organization_id.into(), record.integration_type.clone());
        self.records
            .write()
            .expect("integration store poisoned")
            .insert(key, record);
    }

    /// Convenience for tests: seal and insert an active record.
    pub fn insert_fields(
        &self,
        organization_id: impl Into<String>,
        integration_type: IntegrationType,
        fields: &CredentialMap,
    ) {
        self.insert(
            organization_id,
            SealedIntegration {
                integration_type,
                payload: PlainCipher::seal(fields),
                active: true,
            },
        );
    }
}

#[async_trait]
impl IntegrationStore for MemoryIntegrationStore {
    async fn active_integration(
        &self,
        organization_id: &str,
        integration_type: &IntegrationType,
    ) -> Result<Option<SealedIntegration>, CredentialError> {
        let key = (organization_id.to_string(), integration_type.clone());
        let records = self.records.read().expect("integration store poisoned");
        Ok(records.get(&key).filter(|r| r.active).cloned())
    }
}
