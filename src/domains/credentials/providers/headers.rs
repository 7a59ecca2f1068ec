//! Transport-header credential provider.
//!
//! Third in the chain, intended for tests and trusted internal callers: each
//! required credential field has one fixed header name. The mapping is
//! all-or-nothing - a single missing header invalidates the whole result.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use crate::domains::credentials::error::CredentialError;
use crate::domains::credentials::provider::{CredentialProvider, ResolveRequest};
use crate::domains::credentials::record::{CredentialMap, CredentialRecord};
use crate::domains::registry::IntegrationType;

/// Field name to header name mapping for one integration type.
pub type HeaderFieldMap = HashMap<String, String>;

/// Reads credentials from fixed request headers.
pub struct HeaderCredentialProvider {
    mappings: HashMap<IntegrationType, HeaderFieldMap>,
}

impl HeaderCredentialProvider {
    pub fn new(mappings: HashMap<IntegrationType, HeaderFieldMap>) -> Self {
        Self { mappings }
    }

    /// Header names this provider reads for an integration type. The CORS
    /// preflight allow-list is built from these.
    pub fn header_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .mappings
            .values()
            .flat_map(|m| m.values().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[async_trait]
impl CredentialProvider for HeaderCredentialProvider {
    fn name(&self) -> &'static str {
        "headers"
    }

    async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        let Some(mapping) = self.mappings.get(&request.integration_type) else {
            return Ok(None);
        };

        let mut fields = CredentialMap::new();
        for field in &request.required_fields {
            let Some(header) = mapping.get(field) else {
                debug!(field, "no header mapped for required field");
                return Ok(None);
            };
            match request.header(header) {
                Some(value) if !value.trim().is_empty() => {
                    fields.insert(field.clone(), value.to_string());
                }
                _ => {
                    // All-or-nothing: one absent header voids the result.
                    debug!(field, header, "credential header missing");
                    return Ok(None);
                }
            }
        }

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

    fn provider() -> HeaderCredentialProvider {
        let mut shopify = HeaderFieldMap::new();
        shopify.insert("shopDomain".into(), "x-shopify-shop-domain".into());
        shopify.insert("accessToken".into(), "x-shopify-access-token".into());

        let mut mappings = HashMap::new();
        mappings.insert("shopify".into(), shopify);
        HeaderCredentialProvider::new(mappings)
    }

    fn request(headers: &[(&str, &str)]) -> ResolveRequest {
        let map = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ResolveRequest::new(
            "org_1",
            "shopify".into(),
            vec!["shopDomain".into(), "accessToken".into()],
        )
        .with_headers(map)
    }

    #[tokio::test]
    async fn test_all_headers_present() {
        let record = provider()
            .resolve(&request(&[
                ("x-shopify-shop-domain", "demo.myshopify.com"),
                ("x-shopify-access-token", "shpat_1"),
            ]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.get("shopDomain"), Some("demo.myshopify.com"));
        assert_eq!(record.get("accessToken"), Some("shpat_1"));
    }

    #[tokio::test]
    async fn test_one_missing_header_voids_result() {
        let result = provider()
            .resolve(&request(&[("x-shopify-shop-domain", "demo.myshopify.com")]))
            .await
            .unwrap();
        assert!(result.is_none(), "all-or-nothing: partial headers yield nothing");
    }

    #[tokio::test]
    async fn test_unmapped_integration_falls_through() {
        let req = ResolveRequest::new("org_1", "payments".into(), vec!["apiKey".into()]);
        let result = provider().resolve(&req).await.unwrap();
        assert!(result.is_none());
    }
}
