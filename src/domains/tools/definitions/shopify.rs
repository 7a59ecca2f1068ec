//! Shopify integration definition.
//!
//! E-commerce backend tools. The business logic behind each handler is an
//! opaque collaborator from the gateway's point of view; these demo handlers
//! return structured placeholder data shaped like the real backend responses.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::domains::registry::{ConfigurationIssue, ServerDescriptor, ServerTransport};
use crate::domains::tools::catalog::{ToolCallEnv, ToolCatalog, ToolHandler, ToolMetadata};
use crate::domains::tools::error::ToolError;

use super::{IntegrationDefinition, schema_for};

/// Integration type served by this definition.
pub const INTEGRATION_TYPE: &str = "shopify";

/// Credential fields every authenticated Shopify tool needs.
pub const REQUIRED_CREDENTIAL_FIELDS: &[&str] = &["shopDomain", "accessToken"];

// ============================================================================
// searchProducts
// ============================================================================

/// Parameters for the product search tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchProductsParams {
    /// Free-text search query.
    pub query: String,

    /// Maximum number of results to return.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Product search tool.
pub struct SearchProductsTool;

impl SearchProductsTool {
    pub const NAME: &'static str = "searchProducts";
    pub const DESCRIPTION: &'static str =
        "Search the store's product catalog by free-text query. Returns matching products with ids, titles, and prices.";

    pub fn execute(
        params: &SearchProductsParams,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let shop = env
            .credentials
            .as_ref()
            .and_then(|c| c.get("shopDomain"))
            .unwrap_or("unknown-shop");
        let limit = params.limit.unwrap_or(5).min(50);

        info!(query = %params.query, limit, "searching products");

        let products: Vec<serde_json::Value> = (1..=limit.min(3))
            .map(|i| {
                serde_json::json!({
                    "id": format!("prod_{i}"),
                    "title": format!("{} (result {i})", params.query),
                    "price": { "amount": format!("{}.00", 10 * i), "currency": "USD" },
                })
            })
            .collect();

        Ok(serde_json::json!({
            "shop": shop,
            "query": params.query,
            "products": products,
        }))
    }
}

#[async_trait]
impl ToolHandler for SearchProductsTool {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let params: SearchProductsParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        Self::execute(&params, env)
    }
}

// ============================================================================
// getProductDetails
// ============================================================================

/// Parameters for the product details tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetProductDetailsParams {
    /// Product identifier.
    pub product_id: String,
}

/// Product details tool.
pub struct GetProductDetailsTool;

impl GetProductDetailsTool {
    pub const NAME: &'static str = "getProductDetails";
    pub const DESCRIPTION: &'static str =
        "Fetch full details for a single product by id, including variants and inventory.";

    pub fn execute(
        params: &GetProductDetailsParams,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let shop = env
            .credentials
            .as_ref()
            .and_then(|c| c.get("shopDomain"))
            .unwrap_or("unknown-shop");

        Ok(serde_json::json!({
            "shop": shop,
            "product": {
                "id": params.product_id,
                "title": format!("Product {}", params.product_id),
                "variants": [{ "id": format!("{}-default", params.product_id), "inventory": 12 }],
            },
        }))
    }
}

#[async_trait]
impl ToolHandler for GetProductDetailsTool {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let params: GetProductDetailsParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        Self::execute(&params, env)
    }
}

// ============================================================================
// getOrderStatus
// ============================================================================

/// Parameters for the order status tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetOrderStatusParams {
    /// Order identifier.
    pub order_id: String,
}

/// Order status tool.
pub struct GetOrderStatusTool;

impl GetOrderStatusTool {
    pub const NAME: &'static str = "getOrderStatus";
    pub const DESCRIPTION: &'static str =
        "Look up fulfillment and payment status for an order by id.";

    pub fn execute(
        params: &GetOrderStatusParams,
        _env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::json!({
            "order": {
                "id": params.order_id,
                "fulfillmentStatus": "fulfilled",
                "paymentStatus": "paid",
            },
        }))
    }
}

#[async_trait]
impl ToolHandler for GetOrderStatusTool {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let params: GetOrderStatusParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        Self::execute(&params, env)
    }
}

// ============================================================================
// Integration assembly
// ============================================================================

/// Build the Shopify integration: descriptor, catalog, and credential
/// channel mappings.
pub fn integration() -> Result<IntegrationDefinition, ConfigurationIssue> {
    let descriptor = ServerDescriptor {
        name: "shopify".into(),
        transport: ServerTransport::InProcess,
        timeout_ms: 8_000,
        retries: 2,
        required_credential_fields: REQUIRED_CREDENTIAL_FIELDS
            .iter()
            .map(|f| (*f).to_string())
            .collect(),
        supported_integration_types: vec![INTEGRATION_TYPE.into()],
        settings: serde_json::json!({ "apiVersion": "2024-07" }),
    };

    let mut catalog = ToolCatalog::for_server(&descriptor.name);
    catalog.register_tool(
        SearchProductsTool::NAME,
        SearchProductsTool::DESCRIPTION,
        schema_for::<SearchProductsParams>(),
        Arc::new(SearchProductsTool),
        ToolMetadata {
            category: "ecommerce".into(),
            requires_auth: true,
        },
    )?;
    catalog.register_tool(
        GetProductDetailsTool::NAME,
        GetProductDetailsTool::DESCRIPTION,
        schema_for::<GetProductDetailsParams>(),
        Arc::new(GetProductDetailsTool),
        ToolMetadata {
            category: "ecommerce".into(),
            requires_auth: true,
        },
    )?;
    catalog.register_tool(
        GetOrderStatusTool::NAME,
        GetOrderStatusTool::DESCRIPTION,
        schema_for::<GetOrderStatusParams>(),
        Arc::new(GetOrderStatusTool),
        ToolMetadata {
            category: "ecommerce".into(),
            requires_auth: true,
        },
    )?;

    Ok(IntegrationDefinition {
        descriptor,
        catalog,
        credential_headers: [
            ("shopDomain".to_string(), "x-shopify-shop-domain".to_string()),
            ("accessToken".to_string(), "x-shopify-access-token".to_string()),
        ]
        .into(),
        env_credentials: [
            ("shopDomain".to_string(), "SHOPIFY_SHOP_DOMAIN".to_string()),
            ("accessToken".to_string(), "SHOPIFY_ACCESS_TOKEN".to_string()),
        ]
        .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::credentials::{CredentialMap, CredentialRecord};

    fn env_with_credentials() -> ToolCallEnv {
        let mut fields = CredentialMap::new();
        fields.insert("shopDomain".into(), "demo.myshopify.com".into());
        fields.insert("accessToken".into(), "shpat_1".into());
        ToolCallEnv::new(
            Some(CredentialRecord::new("org_1", INTEGRATION_TYPE.into(), fields)),
            serde_json::json!({}),
        )
    }

    #[test]
    fn test_integration_registers_three_tools() {
        let def = integration().unwrap();
        assert_eq!(def.catalog.len(), 3);
        assert!(def.catalog.get(SearchProductsTool::NAME).is_some());
        assert_eq!(def.descriptor.required_credential_fields.len(), 2);
    }

    #[test]
    fn test_search_products_uses_shop_domain() {
        let params = SearchProductsParams {
            query: "mug".into(),
            limit: Some(2),
        };
        let result = SearchProductsTool::execute(&params, &env_with_credentials()).unwrap();
        assert_eq!(result["shop"], "demo.myshopify.com");
        assert_eq!(result["query"], "mug");
    }

    #[tokio::test]
    async fn test_handler_rejects_bad_arguments() {
        let err = SearchProductsTool
            .call(serde_json::json!({"limit": 2}), &env_with_credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
