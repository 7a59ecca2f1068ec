//! Credential records.
//!
//! A `CredentialRecord` is the decrypted field map for one tenant and one
//! integration type. It exists transiently per resolution call and must never
//! be logged in full; `Debug` redacts every value.

use std::collections::HashMap;
use std::fmt;

use crate::domains::registry::IntegrationType;

/// Field name to secret value map.
pub type CredentialMap = HashMap<String, String>;

/// Resolved credentials scoped to (organization, integration type).
#[derive(Clone)]
pub struct CredentialRecord {
    organization_id: String,
    integration_type: IntegrationType,
    fields: CredentialMap,
}

impl CredentialRecord {
    pub fn new(
        organization_id: impl Into<String>,
        integration_type: IntegrationType,
        fields: CredentialMap,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            integration_type,
            fields,
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn integration_type(&self) -> &IntegrationType {
        &self.integration_type
    }

    /// Get one secret field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Required fields that are absent or blank in this record.
    pub fn missing_fields(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|field| {
                self.fields
                    .get(*field)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Whether every required field is present and non-empty.
    pub fn is_complete(&self, required: &[String]) -> bool {
        self.missing_fields(required).is_empty()
    }
}

/// Redact secret values from logs; field names are safe, values are not.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.field_names().collect();
        names.sort_unstable();
        f.debug_struct("CredentialRecord")
            .field("organization_id", &self.organization_id)
            .field("integration_type", &self.integration_type)
            .field("fields", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CredentialRecord {
        let mut fields = CredentialMap::new();
        fields.insert("accessToken".into(), "shpat_secret".into());
        fields.insert("shopDomain".into(), "demo.myshopify.com".into());
        CredentialRecord::new("org_1", "shopify".into(), fields)
    }

    #[test]
    fn test_missing_fields() {
        let record = record();
        assert!(record.is_complete(&["accessToken".into(), "shopDomain".into()]));
        assert_eq!(
            record.missing_fields(&["accessToken".into(), "apiVersion".into()]),
            vec!["apiVersion".to_string()]
        );
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut fields = CredentialMap::new();
        fields.insert("apiKey".into(), "   ".into());
        let record = CredentialRecord::new("org_1", "payments".into(), fields);
        assert!(!record.is_complete(&["apiKey".into()]));
    }

    #[test]
    fn test_debug_redacts_values() {
        let debug = format!("{:?}", record());
        assert!(debug.contains("accessToken"));
        assert!(!debug.contains("shpat_secret"));
        assert!(!debug.contains("demo.myshopify.com"));
    }
}
