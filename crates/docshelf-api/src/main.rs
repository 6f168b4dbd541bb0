//! docshelf-api - HTTP API server for docshelf

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use docshelf_core::defaults::{PAGE_LIMIT_MAX, SEARCH_LIMIT};
use docshelf_core::{
    stored_filename, validate_upload, AppConfig, CreateDocumentRequest, DocumentRepository,
    JobRepository, JobType, ListDocumentsRequest, TagRepository, TextExtractor,
};
use docshelf_db::{Database, FilesystemBackend, StorageBackend};
use docshelf_jobs::{ExtractTextHandler, JobWorker, PdfTextExtractor, WorkerConfig};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
struct AppState {
    db: Database,
    config: Arc<AppConfig>,
}

// =============================================================================
// CORS CONFIGURATION HELPER
// =============================================================================

/// Convert configured origins into header values, dropping invalid entries.
///
/// Strict origin whitelisting: `allow_origin(Any)` would let any website
/// make credentialed requests to the API.
fn parse_allowed_origin_values(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "docshelf_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docshelf_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("docshelf-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Load configuration once; components receive it explicitly.
    let config = Arc::new(AppConfig::from_env()?);
    if config.has_default_secret() {
        warn!("SECRET_KEY is the development placeholder; set it before exposing this server");
    }

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize the upload directory storage backend
    let file_store = FilesystemBackend::new(&config.upload_dir);
    if let Err(e) = file_store.validate().await {
        anyhow::bail!("Upload directory {} is unusable: {}", config.upload_dir, e);
    }
    let db = db.with_file_store(file_store);
    info!("File storage initialized at {}", config.upload_dir);

    // Verify the extractor's external tooling is present
    if !PdfTextExtractor.health_check().await.unwrap_or(false) {
        warn!("pdftotext not found on PATH; uploads will be marked failed until it is installed");
    }

    // Create and start job worker
    let _worker_handle = if config.worker.enabled {
        info!("Starting job worker...");
        let worker = JobWorker::new(db.clone(), WorkerConfig::from_settings(&config.worker));
        worker
            .register_handler(ExtractTextHandler::new(
                db.clone(),
                Arc::new(PdfTextExtractor),
            ))
            .await;
        let handle = worker.start();
        info!("Job worker started");
        Some(handle)
    } else {
        info!("Job worker disabled");
        None
    };

    let state = AppState {
        db,
        config: config.clone(),
    };

    // Multipart framing overhead on top of the file ceiling.
    let body_limit = config.max_upload_bytes + 1024 * 1024;

    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Documents
        .route("/documents", get(list_documents).post(upload_document))
        .route("/documents/:id", get(get_document).delete(delete_document))
        // Tagging
        .route("/documents/:id/tags", post(add_tags))
        .route("/documents/:id/tags/:tag_id", delete(remove_tag))
        .route("/tags", get(list_tags))
        // Search
        .route("/search", get(search_documents))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origin_values(&config.allowed_origins);
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        // axum's default extractor limit is 2 MB; raise both limits to the
        // configured upload ceiling plus framing overhead.
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// RESPONSE ENVELOPES
// =============================================================================

/// Standardized pagination metadata for list endpoints.
#[derive(Debug, Serialize)]
struct Pagination {
    total: i64,
    limit: i64,
    offset: i64,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct ListEnvelope<T> {
    data: Vec<T>,
    pagination: Pagination,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Accept a PDF upload: validate, persist to the upload directory, create
/// the `pending` row, then queue extraction, so a crash mid-pipeline
/// leaves a visible record instead of silent loss. Responds before
/// extraction runs; clients observe `processed`/`failed` on later reads.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if field.name() == Some("file") {
            original_name = field.file_name().map(|s| s.to_string());
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {}", e)))?
                    .to_vec(),
            );
            break;
        }
    }

    let data = file_bytes.ok_or_else(|| {
        ApiError::BadRequest("No file uploaded. Use multipart field 'file'.".to_string())
    })?;
    let raw_name = original_name.unwrap_or_default();

    let display_name = validate_upload(
        &raw_name,
        data.len() as u64,
        state.config.max_upload_bytes as u64,
    )?;

    let stored = stored_filename(Uuid::now_v7());
    let store = state.db.file_store()?.clone();
    store.write(&stored, &data).await?;

    let id = state
        .db
        .documents
        .insert(CreateDocumentRequest {
            original_filename: display_name,
            stored_filename: stored,
            file_size: data.len() as i64,
        })
        .await?;

    state
        .db
        .jobs
        .queue(
            Some(id),
            JobType::ExtractText,
            JobType::ExtractText.default_priority(),
            None,
        )
        .await?;

    info!(document_id = %id, size = data.len(), "Upload accepted, extraction queued");

    let document = state.db.documents.fetch(id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[derive(Debug, Deserialize)]
struct ListDocumentsQuery {
    skip: Option<i64>,
    limit: Option<i64>,
    tag: Option<String>,
}

async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(docshelf_core::defaults::PAGE_LIMIT);
    let offset = query.skip.unwrap_or(0);

    let response = state
        .db
        .documents
        .list(ListDocumentsRequest {
            limit: Some(limit),
            offset: Some(offset),
            tag: query.tag,
        })
        .await?;

    let effective_limit = limit.clamp(1, PAGE_LIMIT_MAX);
    let effective_offset = offset.max(0);
    let has_more = effective_offset + (response.documents.len() as i64) < response.total;

    Ok(Json(ListEnvelope {
        data: response.documents,
        pagination: Pagination {
            total: response.total,
            limit: effective_limit,
            offset: effective_offset,
            has_more,
        },
    }))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.db.documents.fetch(id).await?;
    Ok(Json(document))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.db.documents.delete(id).await?;

    // The row (and its associations) are gone; removing the file cannot
    // fail the request anymore.
    let store = state.db.file_store()?;
    if let Err(e) = store.delete(&deleted.stored_filename).await {
        warn!(
            document_id = %id,
            stored_filename = %deleted.stored_filename,
            error = %e,
            "Failed to remove stored file for deleted document"
        );
    }

    info!(document_id = %id, "Document deleted");
    Ok(Json(serde_json::json!({ "id": id, "deleted": true })))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<i64>,
}

async fn search_documents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(SEARCH_LIMIT).clamp(1, PAGE_LIMIT_MAX);
    let hits = state.db.search.search(&query.q, limit).await?;
    Ok(Json(hits))
}

async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags.list_all().await?;
    Ok(Json(tags))
}

/// Request body for attaching tags to a document.
///
/// Unknown fields are rejected so malformed shapes fail at the boundary.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddTagsRequest {
    tag_names: Vec<String>,
}

async fn add_tags(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.tags.attach(id, &body.tag_names).await?;
    let document = state.db.documents.fetch(id).await?;
    Ok(Json(document))
}

async fn remove_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.tags.detach(id, tag_id).await?;
    Ok(Json(serde_json::json!({
        "document_id": id,
        "tag_id": tag_id,
        "detached": true,
    })))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Internal(docshelf_core::Error),
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge(String),
    Conflict(String),
}

impl From<docshelf_core::Error> for ApiError {
    fn from(err: docshelf_core::Error) -> Self {
        match &err {
            docshelf_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            docshelf_core::Error::DocumentNotFound(id) => {
                ApiError::NotFound(format!("Document {} not found", id))
            }
            docshelf_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            docshelf_core::Error::FileTooLarge { .. } => {
                ApiError::PayloadTooLarge(err.to_string())
            }
            docshelf_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    return ApiError::Conflict("Resource already exists".to_string());
                }
                ApiError::Internal(err)
            }
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                // Detail stays in the logs; clients get a generic body.
                tracing::error!(error = %err, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
