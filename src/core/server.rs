//! Gateway assembly and the invocation dispatcher.
//!
//! This module composes the domain pieces into one `Gateway`: the server
//! registry built from the integration definitions, the credential chain,
//! agent tool selections, usage attribution, and optional rate limiting.
//!
//! ## Invocation Flow
//!
//! Every tool call runs the same sequence:
//! 1. rate-limit check for the calling organization
//! 2. registry resolution of the path segment (name, then integration type)
//! 3. effective tool selection (explicit side channel, else stored selection)
//! 4. deny-by-default filtering and dispatch-table construction
//! 5. credential resolution through the chain, when the tool requires auth
//! 6. execution with per-call timeout and retry isolation
//! 7. usage attribution from the propagated request context

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::config::Config;
use crate::core::context;
use crate::core::error::{Error, Result};
use crate::core::ratelimit::RateLimiter;
use crate::domains::credentials::providers::{
    EnvCredentialProvider, EnvFieldMap, HeaderCredentialProvider, HeaderFieldMap,
    StoreCredentialProvider, TokenCredentialProvider,
};
use crate::domains::credentials::{
    CredentialCache, CredentialChain, CredentialCipher, CredentialProvider, CredentialRecord,
    IntegrationStore, MemoryIntegrationStore, PlainCipher, ResolveRequest,
};
use crate::domains::registry::{IntegrationType, ServerEntry, ServerRegistry};
use crate::domains::tools::definitions::{self, IntegrationBuilder};
use crate::domains::tools::{
    DispatchTable, MemorySelectionStore, SelectionStore, ToolCallEnv, ToolCallOutput, ToolError,
};
use crate::domains::usage::{CompletionEvent, TracingLedger, UsageLedger, UsageRecorder};

/// One inbound tool-call request, as seen by the dispatcher.
///
/// The transport layer captures everything here; the dispatcher never reaches
/// back into transport state.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Path segment naming the target server (name or integration type).
    pub server: String,

    /// Tool name to invoke.
    pub tool: String,

    /// Tool arguments as given by the client.
    pub arguments: serde_json::Value,

    /// Explicit tool selection from the request side channel, when present.
    /// `None` defers to the calling agent's stored selection.
    pub selected_tools: Option<Vec<String>>,

    /// Lower-cased header snapshot for the header credential provider.
    pub headers: HashMap<String, String>,

    /// Short-lived signed credential token, when the request carried one.
    pub credential_token: Option<String>,
}

impl InvocationRequest {
    pub fn new(
        server: impl Into<String>,
        tool: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
            arguments,
            selected_tools: None,
            headers: HashMap::new(),
            credential_token: None,
        }
    }
}

/// The assembled gateway. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<Config>,
    registry: Arc<ServerRegistry>,
    chain: Arc<CredentialChain>,
    selections: Arc<dyn SelectionStore>,
    usage: Arc<UsageRecorder>,
    rate_limiter: Option<Arc<RateLimiter>>,
    credential_headers: Arc<Vec<String>>,
}

impl Gateway {
    /// Start building a gateway from configuration.
    pub fn builder(config: Config) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// The gateway name reported to clients.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// The gateway version reported to clients.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    /// Request header names the header credential provider reads. The CORS
    /// preflight allow-list includes these.
    pub fn credential_header_names(&self) -> &[String] {
        &self.credential_headers
    }

    /// Drop cached credentials for a tenant/integration pair.
    pub fn invalidate_credentials(
        &self,
        organization_id: &str,
        integration_type: &IntegrationType,
    ) {
        self.chain.invalidate(organization_id, integration_type);
    }

    /// Tool listings for one server, after selection filtering.
    ///
    /// The same deny-by-default rules as dispatch apply: what is not listed
    /// here cannot be called either.
    pub async fn exposed_tools(
        &self,
        server: &str,
        selected_tools: Option<Vec<String>>,
    ) -> Result<Vec<serde_json::Value>> {
        let entry = self
            .registry
            .resolve(server)
            .ok_or_else(|| Error::ServerNotFound(server.to_string()))?;

        let selection = self.effective_selection(entry, server, selected_tools).await;
        let table = DispatchTable::build(
            entry.catalog.filter(selection.as_deref()),
            &entry.descriptor,
        );
        Ok(table.listings())
    }

    /// Execute one tool call end to end.
    pub async fn handle_invocation(&self, request: InvocationRequest) -> Result<ToolCallOutput> {
        let ctx = context::current_context();
        let organization_id = ctx
            .as_ref()
            .map(|c| c.organization_id.clone())
            .unwrap_or_default();

        if let Some(limiter) = &self.rate_limiter {
            let key = if organization_id.is_empty() {
                "anonymous"
            } else {
                organization_id.as_str()
            };
            if !limiter.check(key) {
                return Err(Error::RateLimited {
                    organization_id: key.to_string(),
                });
            }
        }

        let entry = self
            .registry
            .resolve(&request.server)
            .ok_or_else(|| Error::ServerNotFound(request.server.clone()))?;

        let selection = self
            .effective_selection(entry, &request.server, request.selected_tools.clone())
            .await;
        let table = DispatchTable::build(
            entry.catalog.filter(selection.as_deref()),
            &entry.descriptor,
        );

        // Filtered-out tools are structurally absent here, so they answer
        // exactly like names that never existed.
        let Some(descriptor) = table.get(&request.tool) else {
            debug!(
                server = %request.server,
                tool = %request.tool,
                exposed = table.len(),
                "tool not exposed for this request"
            );
            return Err(ToolError::unknown(&request.tool).into());
        };

        let integration_type = self.integration_type_for(entry, &request.server);
        let resolve = ResolveRequest::new(
            organization_id.clone(),
            integration_type.clone(),
            entry.descriptor.required_credential_fields.clone(),
        )
        .with_headers(request.headers.clone());
        let resolve = match &request.credential_token {
            Some(token) => resolve.with_token(token.clone()),
            None => resolve,
        };

        let credentials: Option<CredentialRecord> = if descriptor.metadata.requires_auth {
            Some(self.chain.resolve(&resolve).await?)
        } else {
            // Best effort for unauthenticated tools; absence is fine.
            self.chain.resolve(&resolve).await.ok()
        };

        let env = ToolCallEnv::new(credentials, entry.descriptor.settings.clone());
        info!(
            server = %entry.descriptor.name,
            tool = %request.tool,
            request_id = %env.request_id,
            "dispatching tool call"
        );

        let output = table.execute(&request.tool, request.arguments, &env).await?;

        self.record_usage(&request.tool, &output);
        Ok(output)
    }

    /// The effective selection for this request: explicit side channel first,
    /// else the calling agent's stored selection. A disabled selection
    /// exposes nothing, the same as no selection at all.
    async fn effective_selection(
        &self,
        entry: &ServerEntry,
        server: &str,
        explicit: Option<Vec<String>>,
    ) -> Option<Vec<String>> {
        if explicit.is_some() {
            return explicit;
        }

        let agent_id = context::current_context().and_then(|c| c.agent_id)?;
        let integration_type = self.integration_type_for(entry, server);
        let selection = self
            .selections
            .selection_for(&agent_id, &integration_type)
            .await?;

        if !selection.enabled {
            debug!(
                agent_id = %agent_id,
                integration_type = %integration_type,
                "stored selection is disabled; exposing nothing"
            );
            return Some(Vec::new());
        }
        Some(selection.selected_tools)
    }

    /// The integration type in effect for a resolved request segment: the
    /// segment itself when the server supports it, else the server's primary
    /// type.
    fn integration_type_for(&self, entry: &ServerEntry, segment: &str) -> IntegrationType {
        let as_type = IntegrationType::new(segment);
        if entry.descriptor.supports(&as_type) {
            return as_type;
        }
        entry
            .descriptor
            .supported_integration_types
            .first()
            .cloned()
            .unwrap_or(as_type)
    }

    /// Emit a usage event for a completed invocation.
    ///
    /// Handlers that talk to a metered backend report consumption under a
    /// `usage` key in their result; unmetered tools bill a zero-token row so
    /// the invocation itself is still accounted for.
    fn record_usage(&self, tool: &str, output: &ToolCallOutput) {
        let usage = serde_json::from_str::<serde_json::Value>(&output.text)
            .ok()
            .and_then(|v| v.get("usage").cloned());

        let completion = CompletionEvent {
            organization_id: None,
            agent_id: None,
            conversation_id: None,
            model: usage
                .as_ref()
                .and_then(|u| u.get("model"))
                .and_then(|m| m.as_str())
                .unwrap_or("none")
                .to_string(),
            input_tokens: usage
                .as_ref()
                .and_then(|u| u.get("inputTokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0),
            output_tokens: usage
                .as_ref()
                .and_then(|u| u.get("outputTokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0),
            source: "tool_call".to_string(),
        };

        debug!(tool, is_error = output.is_error, "recording tool usage");
        self.usage.observe(completion);
    }
}

/// Builder wiring collaborators into a [`Gateway`].
///
/// Development defaults are installed for every collaborator that is not
/// overridden, so tests and local runs need no external services.
pub struct GatewayBuilder {
    config: Config,
    integrations: Vec<IntegrationBuilder>,
    integration_store: Option<Arc<dyn IntegrationStore>>,
    cipher: Option<Arc<dyn CredentialCipher>>,
    selection_store: Option<Arc<dyn SelectionStore>>,
    ledger: Option<Arc<dyn UsageLedger>>,
}

impl GatewayBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            integrations: definitions::default_integrations(),
            integration_store: None,
            cipher: None,
            selection_store: None,
            ledger: None,
        }
    }

    /// Replace the integration registration list.
    pub fn integrations(mut self, integrations: Vec<IntegrationBuilder>) -> Self {
        self.integrations = integrations;
        self
    }

    pub fn integration_store(mut self, store: Arc<dyn IntegrationStore>) -> Self {
        self.integration_store = Some(store);
        self
    }

    pub fn cipher(mut self, cipher: Arc<dyn CredentialCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn selection_store(mut self, store: Arc<dyn SelectionStore>) -> Self {
        self.selection_store = Some(store);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Assemble the gateway.
    ///
    /// Integration registration failures are isolated per integration and
    /// aggregated with the registry validation pass; the gateway starts with
    /// whatever validated cleanly. Only an empty registry is fatal.
    pub fn build(self) -> Result<Gateway> {
        let mut registry = ServerRegistry::new();
        let mut issues = Vec::new();
        let mut header_mappings: HashMap<IntegrationType, HeaderFieldMap> = HashMap::new();
        let mut env_mappings: HashMap<IntegrationType, EnvFieldMap> = HashMap::new();

        for builder in &self.integrations {
            match builder() {
                Ok(definition) => {
                    for integration_type in &definition.descriptor.supported_integration_types {
                        if !definition.credential_headers.is_empty() {
                            header_mappings.insert(
                                integration_type.clone(),
                                definition.credential_headers.clone(),
                            );
                        }
                        if !definition.env_credentials.is_empty() {
                            env_mappings
                                .insert(integration_type.clone(), definition.env_credentials.clone());
                        }
                    }
                    registry.register(definition.descriptor, definition.catalog);
                }
                Err(issue) => {
                    warn!(error = %issue, "integration failed to register; continuing");
                    issues.push(issue);
                }
            }
        }

        issues.extend(registry.validate_configuration());
        for issue in &issues {
            warn!(error = %issue, "configuration issue");
        }
        if registry.is_empty() {
            return Err(Error::Configuration(issues));
        }

        let mut providers: Vec<Arc<dyn CredentialProvider>> = Vec::new();
        if let Some(key) = &self.config.credentials.token_signing_key {
            providers.push(Arc::new(TokenCredentialProvider::new(key)));
        }
        providers.push(Arc::new(StoreCredentialProvider::new(
            self.integration_store
                .unwrap_or_else(|| Arc::new(MemoryIntegrationStore::new())),
            self.cipher.unwrap_or_else(|| Arc::new(PlainCipher)),
        )));
        let mut credential_headers: Vec<String> = header_mappings
            .values()
            .flat_map(|m| m.values().cloned())
            .collect();
        credential_headers.sort_unstable();
        credential_headers.dedup();

        providers.push(Arc::new(HeaderCredentialProvider::new(header_mappings)));
        providers.push(Arc::new(EnvCredentialProvider::new(
            self.config.credentials.allow_env_fallback,
            env_mappings,
        )));

        let mut chain = CredentialChain::new(providers);
        if self.config.credentials.cache_ttl_secs > 0 {
            chain = chain.with_cache(Arc::new(CredentialCache::new(Duration::from_secs(
                self.config.credentials.cache_ttl_secs,
            ))));
        }

        let rate_limiter = self.config.rate_limit.as_ref().map(|rl| {
            Arc::new(RateLimiter::new(
                rl.max_requests,
                Duration::from_secs(rl.window_secs),
            ))
        });

        let gateway = Gateway {
            config: Arc::new(self.config),
            registry: Arc::new(registry),
            chain: Arc::new(chain),
            selections: self
                .selection_store
                .unwrap_or_else(|| Arc::new(MemorySelectionStore::new())),
            usage: Arc::new(UsageRecorder::new(
                self.ledger.unwrap_or_else(|| Arc::new(TracingLedger)),
            )),
            rate_limiter,
            credential_headers: Arc::new(credential_headers),
        };

        info!(
            servers = gateway.registry.len(),
            providers = ?gateway.chain.provider_names(),
            "gateway assembled"
        );
        Ok(gateway)
    }
}
