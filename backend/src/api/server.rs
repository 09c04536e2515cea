//! HTTP Server for the cadastro API.
//!
//! Provides REST endpoints for spreadsheet upload, conversion and
//! transmission, plus a relay to the upstream cadastro API for browsers
//! blocked by CORS.
//!
//! # API Endpoints
//!
//! | Method | Path                        | Description                        |
//! |--------|-----------------------------|------------------------------------|
//! | GET    | `/health`                   | Health check                       |
//! | GET    | `/api/types`                | Record types                       |
//! | GET    | `/api/types/{type}/fields`  | Expected columns for a type        |
//! | POST   | `/api/convert`              | Upload CSV, get XML documents      |
//! | POST   | `/api/submit`               | Send XML documents upstream        |
//! | ANY    | `/api/proxy/{*path}`        | Relay to the upstream API          |
//! | GET    | `/api/logs`                 | SSE stream for real-time logs      |

use axum::{
    body::Bytes,
    extract::{Multipart, Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{any, get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, ConvertResponse, FieldsResponse, SubmitRequest};
use crate::config::Config;
use crate::error::{PipelineError, ServerError, ServerResult, SubmitError};
use crate::models::{Auth, RecordType};
use crate::submit::{join_url, SubmitClient, SubmitReport, XML_CONTENT_TYPE};
use crate::transform::pipeline::convert_bytes;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    upstream_url: String,
    submit: SubmitClient,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            upstream_url: config.upstream_url.clone(),
            submit: SubmitClient::new(config.upstream_url.clone()),
            http: reqwest::Client::new(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Pipeline(err) => match err {
                PipelineError::Csv(_)
                | PipelineError::RecordType(_)
                | PipelineError::Auth(_)
                | PipelineError::Json(_)
                | PipelineError::EmptyInput
                | PipelineError::Submit(SubmitError::NoDocuments) => StatusCode::BAD_REQUEST,
                PipelineError::Submit(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        eprintln!("❌ {}", self);
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/types", get(list_types))
        .route("/api/types/{record_type}/fields", get(type_fields))
        .route("/api/convert", post(convert_upload))
        .route("/api/submit", post(submit_documents))
        .route("/api/proxy/{*path}", any(proxy))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(AppState::new(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Cadastro server running on http://localhost:{}", port);
    println!("   POST /api/convert        - Upload CSV file");
    println!("   POST /api/submit         - Send XML documents");
    println!("   ANY  /api/proxy/...      - Relay to {}", config.upstream_url);
    println!("   GET  /api/logs           - SSE log stream");
    println!("   GET  /health             - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cadastro",
        "version": env!("CARGO_PKG_VERSION"),
        "upstream": state.upstream_url,
        "endpoints": {
            "convert": "POST /api/convert",
            "submit": "POST /api/submit",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_types() -> Json<Vec<FieldsResponse>> {
    Json(RecordType::ALL.iter().copied().map(FieldsResponse::from).collect())
}

async fn type_fields(Path(record_type): Path<String>) -> ServerResult<Json<FieldsResponse>> {
    let record_type: RecordType = record_type.parse().map_err(PipelineError::from)?;
    Ok(Json(FieldsResponse::from(record_type)))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: multipart `file`, `type`, `cnpj`, `token`.
async fn convert_upload(mut multipart: Multipart) -> ServerResult<Json<ConvertResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut record_type: Option<String> = None;
    let mut cnpj = String::new();
    let mut token = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let read_err = |e: axum::extract::multipart::MultipartError| {
            ServerError::BadRequest(format!("Read error: {}", e))
        };

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(field.bytes().await.map_err(read_err)?.to_vec());
            }
            "type" => record_type = Some(field.text().await.map_err(read_err)?),
            "cnpj" => cnpj = field.text().await.map_err(read_err)?,
            "token" => token = field.text().await.map_err(read_err)?,
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let record_type: RecordType = record_type
        .ok_or_else(|| ServerError::BadRequest("No record type provided".into()))?
        .parse()
        .map_err(PipelineError::from)?;
    let auth = Auth::new(&cnpj, &token).map_err(PipelineError::from)?;

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes) as {}",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        record_type.label()
    );
    println!("{}\n", "=".repeat(70));

    let result = convert_bytes(&bytes, record_type, &auth)?;

    Ok(Json(ConvertResponse::from(result)))
}

/// Send documents upstream and report per-document outcomes.
async fn submit_documents(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ServerResult<Json<SubmitReport>> {
    let report = state
        .submit
        .submit_all(request.record_type, &request.documents)
        .await
        .map_err(PipelineError::from)?;
    Ok(Json(report))
}

/// Relay a request to the upstream API, keeping method, content type and body.
async fn proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let mut url = join_url(&state.upstream_url, &path);
    if let Some(query) = query {
        url.push('?');
        url.push_str(&query);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(XML_CONTENT_TYPE)
        .to_string();

    log_info(format!("↪ Relaying {} {}", method, url));

    let response = state
        .http
        .request(method, &url)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    let status = response.status();
    let upstream_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/plain; charset=utf-8")
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    Ok((status, [(header::CONTENT_TYPE, upstream_type)], bytes).into_response())
}
