//! Stripe integration definition.
//!
//! Payments backend tools. Handlers are opaque collaborators; these demo
//! implementations return placeholder data in the backend's response shape.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::domains::registry::{ConfigurationIssue, ServerDescriptor, ServerTransport};
use crate::domains::tools::catalog::{ToolCallEnv, ToolCatalog, ToolHandler, ToolMetadata};
use crate::domains::tools::error::ToolError;

use super::{IntegrationDefinition, schema_for};

/// Integration types served by this definition.
pub const INTEGRATION_TYPES: &[&str] = &["stripe", "payments"];

/// Credential fields every authenticated Stripe tool needs.
pub const REQUIRED_CREDENTIAL_FIELDS: &[&str] = &["apiKey"];

// ============================================================================
// lookupPayment
// ============================================================================

/// Parameters for the payment lookup tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LookupPaymentParams {
    /// Payment intent identifier.
    pub payment_id: String,
}

/// Payment lookup tool.
pub struct LookupPaymentTool;

impl LookupPaymentTool {
    pub const NAME: &'static str = "lookupPayment";
    pub const DESCRIPTION: &'static str =
        "Look up a payment by id. Returns amount, currency, and status.";

    pub fn execute(
        params: &LookupPaymentParams,
        _env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        if params.payment_id.trim().is_empty() {
            return Err(ToolError::invalid_arguments("payment_id must not be empty"));
        }

        Ok(serde_json::json!({
            "payment": {
                "id": params.payment_id,
                "amount": 2450,
                "currency": "usd",
                "status": "succeeded",
            },
        }))
    }
}

#[async_trait]
impl ToolHandler for LookupPaymentTool {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let params: LookupPaymentParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        Self::execute(&params, env)
    }
}

// ============================================================================
// listRecentPayments
// ============================================================================

/// Parameters for the recent payments tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListRecentPaymentsParams {
    /// Maximum number of payments to return.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Recent payments tool.
pub struct ListRecentPaymentsTool;

impl ListRecentPaymentsTool {
    pub const NAME: &'static str = "listRecentPayments";
    pub const DESCRIPTION: &'static str = "List the most recent payments for the account.";

    pub fn execute(
        params: &ListRecentPaymentsParams,
        _env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let limit = params.limit.unwrap_or(3).min(25);
        let payments: Vec<serde_json::Value> = (1..=limit.min(3))
            .map(|i| {
                serde_json::json!({
                    "id": format!("pi_{i}"),
                    "amount": 1000 * i,
                    "currency": "usd",
                    "status": "succeeded",
                })
            })
            .collect();

        Ok(serde_json::json!({ "payments": payments }))
    }
}

#[async_trait]
impl ToolHandler for ListRecentPaymentsTool {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let params: ListRecentPaymentsParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        Self::execute(&params, env)
    }
}

// ============================================================================
// listSupportedCurrencies
// ============================================================================

/// Parameters for the supported currencies tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListSupportedCurrenciesParams {}

/// Supported currencies tool. Public data, needs no credentials.
pub struct ListSupportedCurrenciesTool;

impl ListSupportedCurrenciesTool {
    pub const NAME: &'static str = "listSupportedCurrencies";
    pub const DESCRIPTION: &'static str =
        "List the currencies the payment backend can settle in.";

    pub fn execute(
        _params: &ListSupportedCurrenciesParams,
        _env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::json!({ "currencies": ["usd", "eur", "gbp", "jpy"] }))
    }
}

#[async_trait]
impl ToolHandler for ListSupportedCurrenciesTool {
    async fn call(
        &self,
        arguments: serde_json::Value,
        env: &ToolCallEnv,
    ) -> Result<serde_json::Value, ToolError> {
        let params: ListSupportedCurrenciesParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        Self::execute(&params, env)
    }
}

// ============================================================================
// Integration assembly
// ============================================================================

/// Build the Stripe integration: descriptor, catalog, and credential channel
/// mappings.
pub fn integration() -> Result<IntegrationDefinition, ConfigurationIssue> {
    let descriptor = ServerDescriptor {
        name: "stripe".into(),
        transport: ServerTransport::InProcess,
        timeout_ms: 6_000,
        retries: 1,
        required_credential_fields: REQUIRED_CREDENTIAL_FIELDS
            .iter()
            .map(|f| (*f).to_string())
            .collect(),
        supported_integration_types: INTEGRATION_TYPES.iter().map(|t| (*t).into()).collect(),
        settings: serde_json::json!({ "apiVersion": "2024-06-20" }),
    };

    let mut catalog = ToolCatalog::for_server(&descriptor.name);
    catalog.register_tool(
        LookupPaymentTool::NAME,
        LookupPaymentTool::DESCRIPTION,
        schema_for::<LookupPaymentParams>(),
        Arc::new(LookupPaymentTool),
        ToolMetadata {
            category: "payments".into(),
            requires_auth: true,
        },
    )?;
    catalog.register_tool(
        ListRecentPaymentsTool::NAME,
        ListRecentPaymentsTool::DESCRIPTION,
        schema_for::<ListRecentPaymentsParams>(),
        Arc::new(ListRecentPaymentsTool),
        ToolMetadata {
            category: "payments".into(),
            requires_auth: true,
        },
    )?;
    catalog.register_tool(
        ListSupportedCurrenciesTool::NAME,
        ListSupportedCurrenciesTool::DESCRIPTION,
        schema_for::<ListSupportedCurrenciesParams>(),
        Arc::new(ListSupportedCurrenciesTool),
        ToolMetadata {
            category: "payments".into(),
            requires_auth: false,
        },
    )?;

    Ok(IntegrationDefinition {
        descriptor,
        catalog,
        credential_headers: [("apiKey".to_string(), "x-stripe-api-key".to_string())].into(),
        env_credentials: [("apiKey".to_string(), "STRIPE_API_KEY".to_string())].into(),
    })
}
