//! MCP server handler implementation.
//!
//! Maps each tool call onto a lifecycle trigger of the engine.
use std::sync::Arc;

use crate::tools::{
    ClientCloseParams, ClientOpenParams, EdgeFetchParams, LifecycleMessageParams, clients, edge_fetch, generations,
    lifecycle,
};
use edge_cache_client::{EdgeEngine, Network};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for edge-cache.
#[derive(Clone)]
pub struct EdgeCacheServer {
    engine: Arc<EdgeEngine>,
    /// Carries requests the engine declines.
    network: Arc<dyn Network>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl EdgeCacheServer {
    pub fn new(engine: Arc<EdgeEngine>, network: Arc<dyn Network>) -> Self {
        Self { engine, network, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Offer an intercepted request to the edge cache. Returns the response with its source (network or cache) and the strategy used; requests the cache declines are forwarded unchanged."
    )]
    async fn edge_fetch(&self, params: Parameters<EdgeFetchParams>) -> Result<CallToolResult, McpError> {
        edge_fetch::fetch_impl(&self.engine, self.network.as_ref(), params.0).await
    }

    #[tool(description = "Install trigger: create this deploy's cache generation and pre-populate it.")]
    async fn lifecycle_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.engine).await
    }

    #[tool(description = "Activate trigger: make this deploy's generation current, delete all others, claim open clients.")]
    async fn lifecycle_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.engine).await
    }

    #[tool(description = "Post a control message, e.g. {\"type\": \"SKIP_WAITING\"}. Unknown messages are ignored.")]
    async fn lifecycle_message(&self, params: Parameters<LifecycleMessageParams>) -> Result<CallToolResult, McpError> {
        lifecycle::message_impl(&self.engine, params.0).await
    }

    #[tool(description = "Report a consumer opening, with the generation already serving it if any.")]
    async fn client_open(&self, params: Parameters<ClientOpenParams>) -> Result<CallToolResult, McpError> {
        clients::open_impl(&self.engine, params.0).await
    }

    #[tool(description = "Report a consumer closing. May release a waiting install into activation.")]
    async fn client_close(&self, params: Parameters<ClientCloseParams>) -> Result<CallToolResult, McpError> {
        clients::close_impl(&self.engine, params.0).await
    }

    #[tool(description = "List cache generations with entry counts, the current generation and lifecycle state.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations::generations_impl(&self.engine).await
    }
}

impl ServerHandler for EdgeCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "edge-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
