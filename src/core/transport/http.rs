//! HTTP transport implementation.
//!
//! Per-server MCP endpoints with JSON-RPC over POST. Tool exposure and
//! attribution are controlled per request through headers:
//!
//! - `x-mcp-selected-tools`: JSON array of tool names to expose; takes
//!   precedence over the `selectedTools` comma-separated query parameter
//! - `x-organization-id` / `x-agent-id` / `x-conversation-id`: attribution
//!   context established for the request's call tree
//! - `x-mcp-credential-token`: short-lived signed credential token
//!
//! Browser clients go through CORS preflight; the allow-list names the
//! gateway headers above plus whatever headers the credential providers read.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument, warn};

use super::{HttpConfig, TransportError, TransportResult};
use crate::core::context::{RequestContext, with_request_context};
use crate::core::error::Error;
use crate::core::server::{Gateway, InvocationRequest};
use crate::domains::credentials::CredentialError;
use crate::domains::tools::ToolError;

/// MCP protocol version the gateway speaks.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
struct AppState {
    gateway: Gateway,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router for the gateway.
    pub fn router(&self, gateway: Gateway) -> Router {
        let credential_headers = gateway.credential_header_names().to_vec();
        let state = AppState { gateway };

        let server_path = format!("{}/{{server}}", self.config.base_path);
        let mut app = Router::new()
            .route(
                &server_path,
                get(handle_get)
                    .post(handle_post)
                    .delete(handle_delete),
            )
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state);

        if self.config.enable_cors {
            app = app.layer(cors_layer(&credential_headers));
        }

        app
    }

    /// Run the HTTP transport.
    pub async fn run(self, gateway: Gateway) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(gateway);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → MCP:    {}/{{server}}", self.config.base_path);
        info!("  → Health: GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Preflight allow-list: gateway headers plus the credential headers the
/// providers read.
fn cors_layer(credential_headers: &[String]) -> CorsLayer {
    let mut allowed: Vec<HeaderName> = vec![
        HeaderName::from_static("content-type"),
        HeaderName::from_static("x-mcp-selected-tools"),
        HeaderName::from_static("x-mcp-credential-token"),
        HeaderName::from_static("x-organization-id"),
        HeaderName::from_static("x-agent-id"),
        HeaderName::from_static("x-conversation-id"),
    ];
    for header in credential_headers {
        match HeaderName::from_bytes(header.as_bytes()) {
            Ok(name) => allowed.push(name),
            Err(_) => warn!(header, "invalid credential header name; not allow-listed"),
        }
    }

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(allowed)
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut servers = state
        .gateway
        .registry()
        .server_names()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    servers.sort_unstable();

    Json(serde_json::json!({
        "name": state.gateway.name(),
        "version": state.gateway.version(),
        "transport": "HTTP",
        "protocol": "JSON-RPC 2.0",
        "servers": servers,
        "endpoints": {
            "mcp": "/mcp/{server}",
            "health": "/health"
        }
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Attribution context from the request headers, when present.
fn request_context_from(headers: &HeaderMap) -> Option<RequestContext> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let mut ctx = RequestContext::new(header("x-organization-id")?);
    ctx.agent_id = header("x-agent-id");
    ctx.conversation_id = header("x-conversation-id");
    Some(ctx)
}

/// Effective explicit selection for this request.
///
/// The `x-mcp-selected-tools` header (JSON array) beats the `selectedTools`
/// query parameter (comma-separated). A malformed header is an empty
/// selection, never a pass-through to something broader.
fn selected_tools(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Option<Vec<String>> {
    if let Some(raw) = headers
        .get("x-mcp-selected-tools")
        .and_then(|v| v.to_str().ok())
    {
        return match serde_json::from_str::<Vec<String>>(raw) {
            Ok(names) => Some(names),
            Err(e) => {
                warn!(error = %e, "malformed x-mcp-selected-tools header; exposing nothing");
                Some(Vec::new())
            }
        };
    }

    query.get("selectedTools").map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Lower-cased header snapshot for the credential providers.
fn header_snapshot(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn credential_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-mcp-credential-token")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// List exposed tools for one server.
#[instrument(skip_all, fields(server = %server))]
async fn handle_get(
    State(state): State<AppState>,
    Path(server): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let selection = selected_tools(&headers, &query);
    let listing = async {
        match state.gateway.exposed_tools(&server, selection).await {
            Ok(tools) => Json(serde_json::json!({ "tools": tools })).into_response(),
            Err(e) => error_response(e),
        }
    };

    match request_context_from(&headers) {
        Some(ctx) => with_request_context(ctx, listing).await,
        None => listing.await,
    }
}

/// Terminate a session. The gateway is stateless per request, so there is
/// nothing to tear down server-side.
async fn handle_delete(
    State(state): State<AppState>,
    Path(server): Path<String>,
) -> Response {
    if state.gateway.registry().resolve(&server).is_none() {
        return error_response(Error::ServerNotFound(server));
    }
    info!(server, "session closed");
    StatusCode::NO_CONTENT.into_response()
}

/// Handle JSON-RPC requests.
#[instrument(skip_all, fields(server = %server, method))]
async fn handle_post(
    State(state): State<AppState>,
    Path(server): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    tracing::Span::current().record("method", request.method.as_str());
    info!("Received JSON-RPC request: {}", request.method);

    let process = process_request(&state, &server, &headers, &query, request);
    match request_context_from(&headers) {
        Some(ctx) => with_request_context(ctx, process).await,
        None => process.await,
    }
}

/// Process a JSON-RPC request and return the response.
async fn process_request(
    state: &AppState,
    server: &str,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    request: JsonRpcRequest,
) -> Response {
    if request.jsonrpc != "2.0" {
        return rpc_response(JsonRpcResponse::invalid_request(request.id));
    }

    match request.method.as_str() {
        "initialize" => handle_initialize(state, server, request),

        "tools/list" => handle_tools_list(state, server, headers, query, request).await,

        "tools/call" => handle_tools_call(state, server, headers, query, request).await,

        "ping" => rpc_response(JsonRpcResponse::success(request.id, serde_json::json!({}))),

        // Notifications need no response body in stateless HTTP mode.
        method if method.starts_with("notifications/") => {
            info!("Received notification: {}", method);
            rpc_response(JsonRpcResponse::success(request.id, serde_json::json!(null)))
        }

        _ => {
            warn!("Unknown method: {}", request.method);
            rpc_response(JsonRpcResponse::method_not_found(request.id))
        }
    }
}

/// Handle initialize request.
fn handle_initialize(state: &AppState, server: &str, request: JsonRpcRequest) -> Response {
    if state.gateway.registry().resolve(server).is_none() {
        return error_response(Error::ServerNotFound(server.to_string()));
    }

    let result = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": format!("{}/{}", state.gateway.name(), server),
            "version": state.gateway.version()
        }
    });

    rpc_response(JsonRpcResponse::success(request.id, result))
}

/// Handle tools/list request.
async fn handle_tools_list(
    state: &AppState,
    server: &str,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    request: JsonRpcRequest,
) -> Response {
    let selection = selected_tools(headers, query);
    match state.gateway.exposed_tools(server, selection).await {
        Ok(tools) => rpc_response(JsonRpcResponse::success(
            request.id,
            serde_json::json!({ "tools": tools }),
        )),
        Err(e) => rpc_error_response(request.id, e),
    }
}

/// Handle tools/call request.
async fn handle_tools_call(
    state: &AppState,
    server: &str,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    request: JsonRpcRequest,
) -> Response {
    let params = match request.params {
        Some(p) => p,
        None => {
            return rpc_response(JsonRpcResponse::invalid_params(
                request.id,
                "Missing params",
            ));
        }
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => {
            return rpc_response(JsonRpcResponse::invalid_params(
                request.id,
                "Missing tool name",
            ));
        }
    };

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or(serde_json::json!({}));

    let mut invocation = InvocationRequest::new(server, name, arguments);
    invocation.selected_tools = selected_tools(headers, query);
    invocation.headers = header_snapshot(headers);
    invocation.credential_token = credential_token(headers);

    match state.gateway.handle_invocation(invocation).await {
        Ok(output) => rpc_response(JsonRpcResponse::success(request.id, output.to_json())),
        Err(e) => rpc_error_response(request.id, e),
    }
}

fn rpc_response(response: JsonRpcResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}

/// Map a gateway error onto a JSON-RPC error, except for the errors that are
/// HTTP-level concerns (unknown endpoint, throttling).
fn rpc_error_response(id: Option<serde_json::Value>, error: Error) -> Response {
    match error {
        Error::ServerNotFound(_) | Error::RateLimited { .. } => error_response(error),
        Error::Tool(ToolError::UnknownTool(_)) | Error::Tool(ToolError::InvalidArguments(_)) => {
            rpc_response(JsonRpcResponse::invalid_params(id, error.to_string()))
        }
        Error::Credential(CredentialError::NotConfigured)
        | Error::Credential(CredentialError::Invalid { .. }) => {
            rpc_response(JsonRpcResponse::invalid_params(id, error.to_string()))
        }
        other => rpc_response(JsonRpcResponse::internal_error(id, other.to_string())),
    }
}

/// HTTP-level error rendering for non-RPC failures.
fn error_response(error: Error) -> Response {
    let (status, body) = match &error {
        Error::ServerNotFound(name) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": format!("Unknown server: {name}") }),
        ),
        Error::RateLimited { organization_id } => (
            StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({
                "error": "Rate limit exceeded",
                "organizationId": organization_id,
            }),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": "Internal server error",
                "details": other.to_string(),
            }),
        ),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let mut config = Config::default();
        config.credentials.cache_ttl_secs = 0;
        let gateway = Gateway::builder(config).build().unwrap();
        HttpTransport::new(HttpConfig::default()).router(gateway)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn rpc(method: &str, params: serde_json::Value) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::post("/mcp/shopify")
                    .header("content-type", "application/json")
                    .body(Body::from(rpc("initialize", serde_json::json!({}))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(body["result"]["serverInfo"]["name"], "mcp-gateway/shopify");
    }

    #[tokio::test]
    async fn test_unknown_server_is_404() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::post("/mcp/ghost")
                    .header("content-type", "application/json")
                    .body(Body::from(rpc("initialize", serde_json::json!({}))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unknown server: ghost");
    }

    #[tokio::test]
    async fn test_listing_requires_selection() {
        let app = test_router();
        let response = app
            .oneshot(Request::get("/mcp/shopify").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["tools"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_selection_header_beats_query_parameter() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get("/mcp/shopify?selectedTools=searchProducts")
                    .header("x-mcp-selected-tools", r#"["getOrderStatus"]"#)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "getOrderStatus");
    }

    #[tokio::test]
    async fn test_selection_query_parameter_fallback() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::get("/mcp/shopify?selectedTools=searchProducts,getOrderStatus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tools_call_with_header_credentials() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::post("/mcp/shopify")
                    .header("content-type", "application/json")
                    .header("x-organization-id", "org_1")
                    .header("x-mcp-selected-tools", r#"["searchProducts"]"#)
                    .header("x-shopify-shop-domain", "demo.myshopify.com")
                    .header("x-shopify-access-token", "shpat_1")
                    .body(Body::from(rpc(
                        "tools/call",
                        serde_json::json!({
                            "name": "searchProducts",
                            "arguments": { "query": "mug", "limit": 2 },
                        }),
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["isError"], false);
        let text = body["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("demo.myshopify.com"));
    }

    #[tokio::test]
    async fn test_tools_call_with_stored_credentials() {
        use crate::domains::credentials::{CredentialMap, MemoryIntegrationStore};
        use std::sync::Arc;

        let store = Arc::new(MemoryIntegrationStore::new());
        let mut fields = CredentialMap::new();
        fields.insert("shopDomain".into(), "stored.myshopify.com".into());
        fields.insert("accessToken".into(), "shpat_stored".into());
        store.insert_fields("org_1", "shopify".into(), &fields);

        let mut config = Config::default();
        config.credentials.cache_ttl_secs = 0;
        let gateway = Gateway::builder(config)
            .integration_store(store)
            .build()
            .unwrap();
        let app = HttpTransport::new(HttpConfig::default()).router(gateway);

        let response = app
            .oneshot(
                Request::post("/mcp/shopify")
                    .header("content-type", "application/json")
                    .header("x-organization-id", "org_1")
                    .header("x-mcp-selected-tools", r#"["searchProducts"]"#)
                    .body(Body::from(rpc(
                        "tools/call",
                        serde_json::json!({
                            "name": "searchProducts",
                            "arguments": { "query": "mug" },
                        }),
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        let text = body["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("stored.myshopify.com"));
    }

    #[tokio::test]
    async fn test_unexposed_tool_call_is_invalid_params() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::post("/mcp/shopify")
                    .header("content-type", "application/json")
                    .header("x-organization-id", "org_1")
                    .body(Body::from(rpc(
                        "tools/call",
                        serde_json::json!({
                            "name": "searchProducts",
                            "arguments": { "query": "mug" },
                        }),
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32602);
        assert_eq!(body["error"]["message"], "Unknown tool: searchProducts");
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_found() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::post("/mcp/shopify")
                    .header("content-type", "application/json")
                    .body(Body::from(rpc("resources/list", serde_json::json!({}))))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_delete_closes_session() {
        let app = test_router();
        let response = app
            .oneshot(Request::delete("/mcp/shopify").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_router();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_root_lists_servers() {
        let app = test_router();
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["name"], "mcp-gateway");
        let servers = body["servers"].as_array().unwrap();
        assert!(servers.contains(&serde_json::json!("shopify")));
        assert!(servers.contains(&serde_json::json!("stripe")));
    }
}
