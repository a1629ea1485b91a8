//! HTTP surface for DocQA.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /hackrx/run` – Fetch a document, index it, and answer every question against it.
//!   Returns `{ "answers": [...], "response_time_ms": n }` with answers in question order.
//! - `POST /hackrx/upload` – Build the shared index from a document URL ahead of time.
//! - `POST /hackrx/ask` – Answer questions against the shared index (409 until one exists).
//! - `POST /analyze` – Multipart upload (`file`, `user_query`, optional `output_format`) answered
//!   with a single insight plus a markdown or CSV report.
//! - `GET /metrics` – Indexing and answering counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::processing::{IndexReport, PipelineError, ProcessingApi};
use crate::report::{ReportFormat, render_report};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;

/// Largest accepted `/analyze` upload.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the HTTP router exposing the question-answering API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route("/hackrx/run", post(run_questions::<S>))
        .route("/hackrx/upload", post(upload_document::<S>))
        .route("/hackrx/ask", post(ask_questions::<S>))
        .route(
            "/analyze",
            post(analyze_document::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for `POST /hackrx/run`.
#[derive(Deserialize)]
struct RunRequest {
    /// URL of the document to answer from.
    documents: String,
    /// Questions, answered positionally.
    questions: Vec<String>,
}

/// Response body for the answering endpoints.
#[derive(Serialize)]
struct AnswersResponse {
    answers: Vec<String>,
    response_time_ms: u64,
}

/// Fetch, index and answer in one request.
async fn run_questions<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<AnswersResponse>, AppError>
where
    S: ProcessingApi,
{
    let started = Instant::now();
    let answers = service
        .answer_questions(&request.documents, &request.questions)
        .await?;
    let response_time_ms = elapsed_ms(started);
    tracing::info!(
        questions = request.questions.len(),
        response_time_ms,
        "Run request completed"
    );
    Ok(Json(AnswersResponse {
        answers,
        response_time_ms,
    }))
}

/// Request body for `POST /hackrx/upload`.
#[derive(Deserialize)]
struct UploadRequest {
    document_url: String,
}

/// Build and publish the shared index.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<IndexReport>, AppError>
where
    S: ProcessingApi,
{
    let report = service.index_document(&request.document_url).await?;
    tracing::info!(
        source = %report.source,
        chunks_indexed = report.chunks_indexed,
        chunks_dropped = report.chunks_dropped,
        "Upload request completed"
    );
    Ok(Json(report))
}

/// Request body for `POST /hackrx/ask`.
#[derive(Deserialize)]
struct AskRequest {
    questions: Vec<String>,
}

/// Answer against the shared index.
async fn ask_questions<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswersResponse>, AppError>
where
    S: ProcessingApi,
{
    let started = Instant::now();
    let answers = service.answer_from_index(&request.questions).await?;
    Ok(Json(AnswersResponse {
        answers,
        response_time_ms: elapsed_ms(started),
    }))
}

/// Response body for `POST /analyze`.
#[derive(Serialize)]
struct AnalyzeResponse {
    status: &'static str,
    query: String,
    insights: String,
    report: String,
    format: ReportFormat,
}

/// Uploaded file captured from the multipart body.
struct Upload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Answer one query about an uploaded file and wrap the insight in a report.
async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut upload = None;
    let mut query = None;
    let mut format = ReportFormat::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed_form)?;
                upload = Some(Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "user_query" => query = Some(field.text().await.map_err(malformed_form)?),
            "output_format" => {
                format = ReportFormat::from_name(&field.text().await.map_err(malformed_form)?);
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let upload = upload.ok_or_else(|| missing_field("file"))?;
    let query = query.ok_or_else(|| missing_field("user_query"))?;

    let insights = service
        .analyze_upload(
            &upload.file_name,
            upload.bytes,
            upload.content_type.as_deref(),
            &query,
        )
        .await?;
    let report = render_report(&insights, &query, format, OffsetDateTime::now_utc());
    tracing::info!(file = %upload.file_name, format = ?format, "Analyze request completed");

    Ok(Json(AnalyzeResponse {
        status: "success",
        query,
        insights,
        report,
        format,
    }))
}

fn malformed_form(error: MultipartError) -> AppError {
    AppError(PipelineError::Input(format!("malformed multipart body: {error}")))
}

fn missing_field(name: &str) -> AppError {
    AppError(PipelineError::Input(format!("missing form field `{name}`")))
}

/// Return a concise snapshot of the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(service.metrics_snapshot())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
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
                name: "run",
                method: "POST",
                path: "/hackrx/run",
                description: "Fetch a document, index it, and answer each question from its content. Response returns { \"answers\": [string], \"response_time_ms\": number }.",
                request_example: Some(json!({
                    "documents": "https://example.org/policy.pdf",
                    "questions": ["What is the grace period for premium payment?"]
                })),
            },
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/hackrx/upload",
                description: "Build the shared document index ahead of time, replacing any previous one.",
                request_example: Some(json!({
                    "document_url": "https://example.org/policy.pdf"
                })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/hackrx/ask",
                description: "Answer questions against the shared index built by /hackrx/upload.",
                request_example: Some(json!({
                    "questions": ["Summarize the policy"]
                })),
            },
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Answer one query about an uploaded file (multipart fields: file, user_query, output_format=markdown|csv).",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return indexing and answering counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(PipelineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::Input(_) | PipelineError::Settings(_) | PipelineError::Chunking(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::DocumentFetch(_) => StatusCode::BAD_GATEWAY,
            PipelineError::NoIndex => StatusCode::CONFLICT,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(inner)
    }
}
