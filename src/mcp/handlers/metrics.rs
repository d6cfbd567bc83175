//! Handler for the metrics tool.

use std::sync::Arc;

use crate::processing::PipelineApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current pipeline counters.
pub(crate) async fn handle_metrics(
    pipeline: &Arc<dyn PipelineApi>,
) -> Result<CallToolResult, McpError> {
    let snapshot = pipeline.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "documentsProcessed": snapshot.documents_processed,
        "documentsFailed": snapshot.documents_failed,
        "ocrDocuments": snapshot.ocr_documents,
        "chunksProduced": snapshot.chunks_produced,
        "lastElapsedMs": snapshot.last_elapsed_ms,
    })))
}
