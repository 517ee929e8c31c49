//! MCP stdio server in front of the [`ToolRegistry`]
//!
//! Tool listings are generated from the registry, so every tool advertises
//! the same name, description and input schema it validates against.

mod prompts;
mod resources;

use crate::tools::ToolRegistry;
use crate::Error;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
    JsonObject, ListPromptsResult, ListResourcesResult, ListToolsResult, PaginatedRequestParam,
    Prompt, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
    ServerInfo, Tool as McpTool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServiceExt};
use serde_json::Value;
use std::sync::Arc;

pub use prompts::{PROMPT_ANALYZE_PORTFOLIO, PROMPT_FIND_YIELD};
pub use resources::{RESOURCE_CHAINS, RESOURCE_ENDPOINTS, SUPPORTED_CHAINS};

#[derive(Clone)]
pub struct DefiLlamaServer {
    registry: Arc<ToolRegistry>,
}

impl DefiLlamaServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Tool listing built from each registered tool's own metadata
    pub fn tool_descriptors(&self) -> Vec<McpTool> {
        self.registry
            .tools()
            .iter()
            .map(|tool| {
                McpTool::new(
                    tool.name(),
                    tool.description(),
                    Arc::new(schema_object(tool.input_schema())),
                )
            })
            .collect()
    }

    /// Run one tool; failures are reported in-band with `is_error`
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let args = arguments.map(Value::Object).unwrap_or(Value::Null);
        let output = self.registry.dispatch(name, args).await;
        let content = vec![Content::text(output.text)];
        if output.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }

    pub fn resources(&self) -> Vec<Resource> {
        resources::list()
    }

    pub fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        resources::read(&self.registry, uri)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        prompts::list()
    }

    pub fn prompt(
        &self,
        name: &str,
        arguments: Option<&JsonObject>,
    ) -> Result<GetPromptResult, McpError> {
        prompts::render(name, arguments)
    }
}

/// MCP requires an object schema; anything else becomes an empty one
fn schema_object(schema: Value) -> JsonObject {
    match schema {
        Value::Object(map) => map,
        _ => {
            let mut map = JsonObject::new();
            map.insert("type".to_string(), Value::String("object".to_string()));
            map
        }
    }
}

impl rmcp::ServerHandler for DefiLlamaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "DefiLlama data: protocol and chain TVL, token prices, yield pools, \
                 stablecoins and DEX volumes. Every tool returns markdown text."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_descriptors()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&request.name, request.arguments).await)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(self.resources()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read(&request.uri)
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult::with_all_items(self.prompts()))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.prompt(&request.name, request.arguments.as_ref())
    }
}

/// Serve `registry` over stdin/stdout until the host disconnects
pub async fn serve_stdio(registry: ToolRegistry) -> crate::Result<()> {
    let tools = registry.tools().len();
    let service = DefiLlamaServer::new(registry)
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    tracing::info!(tools, "MCP server ready on stdio");

    let reason = service
        .waiting()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    tracing::info!(reason = ?reason, "MCP server stopped");
    Ok(())
}
