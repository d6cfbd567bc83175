//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    mcp::{
        SUMMARIZE_TOOL,
        format::{json_resource_contents, roles_snapshot, serialize_json, usage_payload},
        handlers::{metrics::handle_metrics, summarize::handle_summarize},
        registry::{self, Registry},
        schemas,
    },
    processing::PipelineApi,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, JsonObject, ListResourcesResult,
        ListToolsResult, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
        ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
    },
};

const ROLES_URI: &str = "mcp://roles";
const SETTINGS_URI: &str = "mcp://settings";
const USAGE_URI: &str = "mcp://usage";

/// MCP server exposing the PDF summarization pipeline.
#[derive(Clone)]
pub struct SmartsumMcpServer {
    pipeline: Arc<dyn PipelineApi>,
    registry: Arc<Registry>,
}

impl SmartsumMcpServer {
    /// Create a new MCP server over the supplied pipeline.
    pub fn new(pipeline: Arc<dyn PipelineApi>) -> Self {
        let registry = Registry::default()
            .with_resource(ROLES_URI, resource_roles)
            .with_resource(SETTINGS_URI, resource_settings)
            .with_resource(USAGE_URI, resource_usage)
            .with_tool(SUMMARIZE_TOOL, tool_summarize)
            .with_tool("metrics", tool_metrics);

        tracing::debug!(
            tools = ?registry.tool_names().collect::<Vec<_>>(),
            "MCP registry ready"
        );

        Self {
            pipeline,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            tool(
                SUMMARIZE_TOOL,
                "PDF Smart Summarizer",
                "Summarize a local PDF for a reader role: extracts the text layer, recognizes scanned pages with OCR, and returns key points, risks and a bounded narrative.",
                schemas::summarize_input_schema(),
                ToolAnnotations::with_title("PDF Smart Summarizer")
                    .read_only(false)
                    .destructive(false)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "metrics",
                "Metrics Snapshot",
                "Check processed, failed and OCR document counts at a glance.",
                schemas::empty_object_schema(),
                ToolAnnotations::with_title("Metrics Snapshot")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut roles = RawResource::new(ROLES_URI, "roles");
        roles.description = Some("Reader roles with a dedicated summary framing".into());

        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description =
            Some("Effective chunking, OCR and summarization settings".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description = Some(
            "Recommended tool flow: read roles, then call pdf-smart-summarizer with a document path."
                .into(),
        );

        vec![
            roles.no_annotation(),
            settings.no_annotation(),
            usage.no_annotation(),
        ]
    }
}

fn tool(
    name: &'static str,
    title: &str,
    description: &'static str,
    input_schema: JsonObject,
    annotations: ToolAnnotations,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: Some(title.to_string()),
        description: Some(Cow::Borrowed(description)),
        input_schema: Arc::new(input_schema),
        output_schema: None,
        annotations: Some(annotations),
        icons: None,
    }
}

fn resource_roles(
    _server: &SmartsumMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                ROLES_URI,
                serialize_json(&roles_snapshot(), ROLES_URI),
            )],
        })
    })
}

fn resource_settings(
    server: &SmartsumMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let snapshot = server.pipeline.settings_snapshot();
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&snapshot, SETTINGS_URI),
            )],
        })
    })
}

fn resource_usage(
    _server: &SmartsumMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage_payload(), USAGE_URI),
            )],
        })
    })
}

fn tool_summarize(
    server: &SmartsumMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_summarize(&pipeline, request.arguments).await })
}

fn tool_metrics(server: &SmartsumMcpServer, _request: CallToolRequestParam) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_metrics(&pipeline).await })
}

impl ServerHandler for SmartsumMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "smartsum".to_string();
        implementation.title = Some("PDF Smart Summarizer".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to summarize local PDF dossiers for a specific reader role. Pass the file path rather than its contents; scanned documents are recognized with OCR automatically.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resource(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tool(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
