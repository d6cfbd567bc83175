//! HTTP surface for the summarizer.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /summarize` – Validate a summarize request, run the pipeline and return the
//!   `{success, data | error}` envelope. Validation failures answer `400`, unreadable documents `422`,
//!   other pipeline failures `500`.
//! - `GET /metrics` – Observe processed/failed/OCR document counters.
//! - `GET /roles` – List roles with a dedicated framing.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same pipeline with the MCP server and the CLI, so behavior is
//! identical across interfaces.

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    ErrorCode, IssueKind, PipelineApi, PipelineFailure, ToolResponse, ValidationError,
    ValidationIssue,
    roles::{RoleProfile, role_catalog},
};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the summarizer.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/summarize", post(summarize_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/roles", get(get_roles))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Summarize a PDF referenced by path.
///
/// The body is passed through untouched so that validation reports every problem in the
/// standard envelope rather than as an extractor rejection.
async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> (StatusCode, Json<ToolResponse>)
where
    S: PipelineApi,
{
    let response = match payload {
        Ok(Json(request)) => service.summarize(request).await,
        Err(rejection) => ToolResponse::failure(&PipelineFailure::from(ValidationError::new(
            vec![ValidationIssue {
                field: "request",
                message: rejection.body_text(),
                kind: IssueKind::Field,
            }],
        ))),
    };
    let status = match response.error_code() {
        None => StatusCode::OK,
        Some(ErrorCode::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::File) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(code) => {
            tracing::debug!(code = %code, "Summarize request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(response))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Response body for `GET /roles`.
#[derive(Serialize)]
struct RolesResponse {
    roles: &'static [RoleProfile],
}

async fn get_roles() -> Json<RolesResponse> {
    Json(RolesResponse {
        roles: role_catalog(),
    })
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Extract, OCR if needed, chunk and summarize a PDF for a given reader role. Returns { \"success\": bool, \"data\" | \"error\" }.",
                request_example: Some(json!({
                    "documentPath": "/cases/2024-001/起诉状.pdf",
                    "role": "lawyer",
                    "goal": "梳理争议焦点与违约责任",
                    "level": "detailed",
                    "focusAreas": ["违约条款"],
                    "outputFormat": "markdown",
                    "language": "zh-CN",
                    "includeOriginalText": false,
                    "maxSummaryLength": 2000,
                    "enableOcr": true,
                    "ocrLanguage": "chi_sim"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return processed, failed and OCR document counters.",
                request_example: None,
            },
            CommandDescriptor {
                name: "roles",
                method: "GET",
                path: "/roles",
                description: "List reader roles that have a dedicated framing; other roles use a generic framing.",
                request_example: None,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        IssueKind, PipelineApi, PipelineFailure, SettingsSnapshot, ToolResponse, ValidationError,
        ValidationIssue,
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/summarize");
        assert!(summarize.description.to_lowercase().contains("ocr"));
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn summarize_route_forwards_payload() {
        let service = Arc::new(StubPipeline::accepting());
        let app = create_router(service.clone());
        let payload = json!({"documentPath": "/docs/a.pdf", "role": "lawyer", "goal": "概述"});

        let (status, body) = send(app, Method::POST, "/summarize", Some(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let calls = service.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["role"], "lawyer");
    }

    #[tokio::test]
    async fn validation_failure_maps_to_bad_request() {
        let service = Arc::new(StubPipeline::rejecting());
        let app = create_router(service);
        let payload = json!({"documentPath": "/docs/a.pdf", "role": "lawyer", "goal": ""});

        let (status, body) = send(app, Method::POST, "/summarize", Some(payload.to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_still_returns_envelope() {
        let service = Arc::new(StubPipeline::accepting());
        let app = create_router(service.clone());

        let (status, body) = send(app, Method::POST, "/summarize", Some("{not json".into())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(service.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn metrics_and_roles_are_served() {
        let service = Arc::new(StubPipeline::accepting());

        let (status, body) = send(create_router(service.clone()), Method::GET, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documentsProcessed"], 3);

        let (status, body) = send(create_router(service), Method::GET, "/roles", None).await;
        assert_eq!(status, StatusCode::OK);
        let keys: Vec<&str> = body["roles"]
            .as_array()
            .expect("roles array")
            .iter()
            .filter_map(|role| role["key"].as_str())
            .collect();
        assert_eq!(keys, vec!["lawyer", "student", "researcher", "manager", "analyst"]);
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let response = app
            .oneshot(
                builder
                    .body(body.map(Body::from).unwrap_or_else(Body::empty))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    struct StubPipeline {
        calls: Mutex<Vec<Value>>,
        reject: bool,
    }

    impl StubPipeline {
        fn accepting() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject: false,
            }
        }

        fn rejecting() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject: true,
            }
        }
    }

    #[async_trait]
    impl PipelineApi for StubPipeline {
        async fn summarize(&self, request: Value) -> ToolResponse {
            self.calls.lock().await.push(request);
            if self.reject {
                return ToolResponse::failure(&PipelineFailure::from(ValidationError::new(vec![
                    ValidationIssue {
                        field: "goal",
                        message: "goal is required".into(),
                        kind: IssueKind::Field,
                    },
                ])));
            }
            ToolResponse {
                success: true,
                data: None,
                error: None,
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 3,
                documents_failed: 1,
                ocr_documents: 1,
                chunks_produced: 9,
                last_elapsed_ms: Some(42),
            }
        }

        fn settings_snapshot(&self) -> SettingsSnapshot {
            SettingsSnapshot {
                chunk_size: 3000,
                scan_density_threshold: 100,
                ocr_page_budget: 5,
                ocr_dpi: 300,
                ocr_timeout_secs: 120,
                summarization_timeout_secs: 60,
                original_text_cap: 5000,
                max_document_bytes: 50 * 1024 * 1024,
                write_output: false,
                ai_model: "stub".into(),
            }
        }
    }
}
