//! Handler for the `pdf-smart-summarizer` MCP tool.

use std::sync::Arc;

use crate::{mcp::handlers::arguments_value, processing::PipelineApi};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};

/// Run the pipeline on the tool arguments.
///
/// The envelope is returned as structured content either way; failed runs, validation included,
/// are flagged with `isError` so hosts surface them to the model.
pub(crate) async fn handle_summarize(
    pipeline: &Arc<dyn PipelineApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let response = pipeline.summarize(arguments_value(arguments)).await;
    let payload = response.to_value();
    match response.error_code() {
        None => Ok(CallToolResult::structured(payload)),
        Some(code) => {
            tracing::info!(code = %code, "Summarize tool call failed");
            Ok(CallToolResult::structured_error(payload))
        }
    }
}
