//! Tool handlers for the MCP server.

use rmcp::model::JsonObject;
use serde_json::Value;

pub(crate) mod metrics;
pub(crate) mod summarize;

/// Raw tool arguments as a JSON object; absent arguments become `{}`.
pub(crate) fn arguments_value(arguments: Option<JsonObject>) -> Value {
    Value::Object(arguments.unwrap_or_default())
}
