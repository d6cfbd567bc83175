//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes the PDF summarizer over stdio. This mode is designed for
//! editor/agent integrations and shares all runtime configuration with the HTTP binary. Console
//! logs go to stderr so stdout carries only JSON-RPC frames.
use anyhow::{Context, Result};
use rmcp::{service::ServiceExt, transport::stdio};
use smartsum::{config, logging, mcp::SmartsumMcpServer, processing::Pipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing_with(false);

    let pipeline = Pipeline::from_config(config::get_config())
        .context("failed to initialize summarization backend")?;
    let server = SmartsumMcpServer::new(Arc::new(pipeline));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
