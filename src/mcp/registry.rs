//! Name-keyed dispatch tables for tools and resources.

use std::{collections::BTreeMap, future::Future, pin::Pin};

use rmcp::ErrorData as McpError;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ReadResourceRequestParam, ReadResourceResult,
};

use super::server::SmartsumMcpServer;

pub(crate) type ResourceFuture =
    Pin<Box<dyn Future<Output = Result<ReadResourceResult, McpError>> + Send>>;
pub(crate) type ToolFuture =
    Pin<Box<dyn Future<Output = Result<CallToolResult, McpError>> + Send>>;

pub(crate) type ResourceHandler =
    fn(&SmartsumMcpServer, ReadResourceRequestParam) -> ResourceFuture;
pub(crate) type ToolHandler = fn(&SmartsumMcpServer, CallToolRequestParam) -> ToolFuture;

/// Maps resource URIs and tool names to handler functions.
#[derive(Default)]
pub(crate) struct Registry {
    resources: BTreeMap<&'static str, ResourceHandler>,
    tools: BTreeMap<&'static str, ToolHandler>,
}

impl Registry {
    pub(crate) fn with_resource(mut self, uri: &'static str, handler: ResourceHandler) -> Self {
        self.resources.insert(uri, handler);
        self
    }

    pub(crate) fn with_tool(mut self, name: &'static str, handler: ToolHandler) -> Self {
        self.tools.insert(name, handler);
        self
    }

    pub(crate) fn resource(&self, uri: &str) -> Option<ResourceHandler> {
        self.resources.get(uri).copied()
    }

    pub(crate) fn tool(&self, name: &str) -> Option<ToolHandler> {
        self.tools.get(name).copied()
    }

    pub(crate) fn tool_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.keys().copied()
    }
}
