//! Model Context Protocol (MCP) integration for the summarizer.
//!
//! This module wires the pipeline into an MCP server so editors and agent hosts can summarize
//! PDFs over stdio. The surface area consists of:
//!
//! - Tools: `pdf-smart-summarizer` and `metrics`.
//! - Resources: `mcp://roles`, `mcp://settings` and `mcp://usage`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::SmartsumMcpServer;

/// Name of the summarize tool as advertised to hosts.
pub const SUMMARIZE_TOOL: &str = "pdf-smart-summarizer";
