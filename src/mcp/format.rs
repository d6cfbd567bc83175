//! Formatting helpers shared across MCP handlers and resources.

use crate::processing::roles::{RoleProfile, role_catalog};
use rmcp::model::ResourceContents;
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Roles manifest returned by the `roles` resource.
#[derive(Debug, Serialize)]
pub(crate) struct RolesSnapshot {
    /// Roles with a dedicated framing, in catalog order.
    pub(crate) roles: &'static [RoleProfile],
    /// Role assumed for framing when a caller sends an unknown one.
    pub(crate) fallback: &'static str,
}

pub(crate) fn roles_snapshot() -> RolesSnapshot {
    RolesSnapshot {
        roles: role_catalog(),
        fallback: "generic",
    }
}

/// Recommended call flow for agent hosts.
pub(crate) fn usage_payload() -> Value {
    json!({
        "title": "PDF Smart Summarizer Usage",
        "policy": [
            "Pass an absolute documentPath; the server reads the file itself.",
            "Do not paste PDF contents into prompts.",
            "State the reader role and a concrete goal (<= 500 chars).",
            "Set includeOriginalText=false unless the extracted text is needed.",
            "Scanned PDFs are recognized automatically when enableOcr is true (default).",
        ],
        "flows": [
            {
                "name": "Summarize",
                "steps": [
                    "readResource(mcp://roles)",
                    "pdf-smart-summarizer({ documentPath, role, goal, level?, focusAreas?, language? })"
                ]
            },
            {
                "name": "Observe",
                "steps": ["metrics({})", "readResource(mcp://settings)"]
            }
        ]
    })
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}
