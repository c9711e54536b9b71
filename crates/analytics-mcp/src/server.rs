//! MCP server implementation
//!
//! This module provides the MCP server that registers the reporting tools
//! and services JSON-RPC invocations over a newline-delimited stdio
//! transport. One invocation is processed at a time; the shared client
//! handle is read-only after construction, so no locking is needed around
//! tool execution itself.

use crate::client::AnalyticsDataClient;
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Transport failure on the stdio channel
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments.
    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult>;
}

/// Context for tool execution.
///
/// Carries the shared analytics client handle. Every tool checks the handle
/// at call time: an absent handle yields a reported error, never a crash.
#[derive(Clone)]
pub struct ToolContext {
    client: Option<Arc<AnalyticsDataClient>>,
}

impl ToolContext {
    /// Create a context bound to an analytics client.
    pub fn new(client: Arc<AnalyticsDataClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Create a context with no client handle.
    pub fn empty() -> Self {
        Self { client: None }
    }

    /// The analytics client, if one was constructed.
    pub fn client(&self) -> Option<&Arc<AnalyticsDataClient>> {
        self.client.as_ref()
    }
}

/// MCP server.
///
/// Holds the registered tools and the execution context, and dispatches
/// JSON-RPC requests to them.
pub struct McpServer {
    /// Server info
    info: ServerInfo,

    /// Server capabilities
    capabilities: ServerCapabilities,

    /// Registered tools
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,

    /// Execution context shared by all tools
    context: ToolContext,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        context: ToolContext,
    ) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities {
                    list_changed: false,
                }),
            },
            tools: Arc::new(RwLock::new(HashMap::new())),
            context,
        }
    }

    /// Create with the default server identity.
    pub fn analytics(context: ToolContext) -> Self {
        Self::new("analytics-mcp", env!("CARGO_PKG_VERSION"), context)
    }

    /// Register a tool.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        let mut tools = self.tools.write().await;
        tools.insert(name, tool);
    }

    /// Register multiple tools.
    pub async fn register_tools(&self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register_tool(tool).await;
        }
    }

    /// Get all tool definitions, ordered by name.
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        let mut definitions: Vec<_> = tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> McpServerResult<ToolResult> {
        let tools = self.tools.read().await;

        let tool = tools
            .get(name)
            .ok_or_else(|| McpServerError::ToolNotFound(name.to_string()))?;

        tool.execute(arguments, &self.context).await
    }

    /// Handle an MCP request.
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => McpResponse::success(request.id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request.id).await,
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => McpResponse::error(request.id, McpError::method_not_found(&request.method)),
        }
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    async fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        let tools = self.list_tools().await;
        McpResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let call: ToolCall = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => return McpResponse::error(id, McpError::invalid_params(e.to_string())),
        };

        // Hosts may omit arguments entirely for tools with no required fields.
        let arguments = if call.arguments.is_null() {
            serde_json::json!({})
        } else {
            call.arguments
        };

        match self.call_tool(&call.name, arguments).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => McpResponse::success(id, value),
                Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
            },
            Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
        }
    }

    /// Serve invocations over stdin/stdout until the host disconnects.
    ///
    /// Messages are newline-delimited JSON-RPC. Notifications produce no
    /// response; unparseable lines produce a parse error response with a
    /// null id so the channel stays usable.
    pub async fn serve_stdio(&self) -> McpServerResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<McpRequest>(line) {
                Ok(request) => {
                    if request.is_notification() {
                        debug!("Ignoring notification: {}", request.method);
                        continue;
                    }
                    self.handle_request(request).await
                }
                Err(e) => {
                    warn!("Failed to parse request: {}", e);
                    McpResponse::error(RequestId::Null, McpError::parse_error())
                }
            };

            let mut payload = serde_json::to_vec(&response)
                .map_err(|e| McpServerError::Internal(e.to_string()))?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }

        debug!("Host disconnected, shutting down");
        Ok(())
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Get server capabilities.
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTool;

    #[async_trait]
    impl Tool for TestTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("test_tool", "A test tool").with_category("test")
        }

        async fn execute(
            &self,
            _args: serde_json::Value,
            _context: &ToolContext,
        ) -> McpServerResult<ToolResult> {
            Ok(ToolResult::text("Test result"))
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = McpServer::analytics(ToolContext::empty());
        assert_eq!(server.info().name, "analytics-mcp");
    }

    #[tokio::test]
    async fn test_register_tool() {
        let server = McpServer::analytics(ToolContext::empty());
        server.register_tool(Arc::new(TestTool)).await;

        let tools = server.list_tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "test_tool");
    }

    #[tokio::test]
    async fn test_call_tool() {
        let server = McpServer::analytics(ToolContext::empty());
        server.register_tool(Arc::new(TestTool)).await;

        let result = server.call_tool("test_tool", serde_json::json!({})).await;

        assert!(result.is_ok());
        assert!(!result.unwrap().is_error);
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let server = McpServer::analytics(ToolContext::empty());

        let result = server.call_tool("nope", serde_json::json!({})).await;
        assert!(matches!(result, Err(McpServerError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let server = McpServer::analytics(ToolContext::empty());

        let req = McpRequest::new("1", "initialize");
        let resp = server.handle_request(req).await;

        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "analytics-mcp");
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let server = McpServer::analytics(ToolContext::empty());

        let req = McpRequest::new("1", "resources/list");
        let resp = server.handle_request(req).await;

        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, McpError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_call_with_null_arguments() {
        let server = McpServer::analytics(ToolContext::empty());
        server.register_tool(Arc::new(TestTool)).await;

        let req = McpRequest::new("1", "tools/call")
            .with_params(serde_json::json!({"name": "test_tool"}));
        let resp = server.handle_request(req).await;

        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_list_tools_sorted() {
        struct Named(&'static str);

        #[async_trait]
        impl Tool for Named {
            fn definition(&self) -> ToolDefinition {
                ToolDefinition::new(self.0, "named")
            }

            async fn execute(
                &self,
                _args: serde_json::Value,
                _context: &ToolContext,
            ) -> McpServerResult<ToolResult> {
                Ok(ToolResult::text(""))
            }
        }

        let server = McpServer::analytics(ToolContext::empty());
        server.register_tool(Arc::new(Named("zeta"))).await;
        server.register_tool(Arc::new(Named("alpha"))).await;

        let names: Vec<_> = server
            .list_tools()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
