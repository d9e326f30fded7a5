use crate::config::Config;
use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use driftbox_core::{
    BlobStore, DEFAULT_CONTENT_TYPE, DeleteBlobOperation, DeleteBlobOperationRequest, DriftError,
    PassthroughTransform, PutBlobOperation, PutBlobOperationRequest, ReadBlobOperation,
    ReadBlobOperationOutcome, ReadBlobOperationRequest, Result, StoreStats, Sweeper, id,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const NOT_FOUND_MESSAGE: &str = "file not found or expired";

pub struct ServerState {
    pub store: Arc<BlobStore>,
    pub put_blob: PutBlobOperation,
    pub read_blob: ReadBlobOperation,
    pub delete_blob: DeleteBlobOperation,
}

impl ServerState {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self {
            put_blob: PutBlobOperation::new(store.clone(), Arc::new(PassthroughTransform)),
            read_blob: ReadBlobOperation::new(store.clone()),
            delete_blob: DeleteBlobOperation::new(store.clone()),
            store,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    file_name: String,
    download_url: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    stats: StoreStats,
}

pub async fn run_server(config: Config) -> Result<()> {
    let store_config = config.store_config()?;
    let store = Arc::new(BlobStore::open(&store_config)?);
    store.purge_orphaned_files().await?;

    let sweeper = Sweeper::new(store.clone(), store_config.sweep_interval).spawn();

    let state = Arc::new(ServerState::new(store));
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);
    tracing::info!(
        "File storage: memory up to {:.2} GB, fallback to disk at {:?}",
        store_config.memory_budget_bytes as f64 / 1024.0 / 1024.0 / 1024.0,
        store_config.disk_path
    );
    tracing::info!("Uploaded files persist for {:?}", store_config.ttl);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.shutdown().await;
    tracing::info!("Server stopped");

    served?;
    Ok(())
}

pub fn router(state: Arc<ServerState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/download/:id", get(download_handler))
        .route("/files/:id", delete(delete_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install SIGTERM handler: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let resp = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, axum::Json(resp)).into_response()
}

/// Map a store error to a response. Internal details stay in the log.
fn drift_error_response(error: DriftError) -> Response {
    match error {
        DriftError::NotFound(_) => error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
        DriftError::InvalidRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
        other => {
            tracing::error!("Request failed: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let resp = ApiResponse {
        success: true,
        data: Some(HealthResponse {
            status: "ok",
            stats: state.store.stats().await,
        }),
        error: None,
    };
    (StatusCode::OK, axum::Json(resp))
}

async fn upload_handler(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file = None;
    let mut target_format = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!("Error parsing multipart form: {}", error);
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("could not parse multipart form: {}", error),
                );
            }
        };

        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(content) => file = Some((content, file_name, content_type)),
                    Err(error) => {
                        tracing::warn!("Error reading uploaded file: {}", error);
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("could not read uploaded file: {}", error),
                        );
                    }
                }
            }
            Some("targetFormat") => match field.text().await {
                Ok(text) => target_format = Some(text),
                Err(error) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("could not read targetFormat: {}", error),
                    );
                }
            },
            _ => {}
        }
    }

    let Some((content, file_name, content_type)) = file else {
        return error_response(StatusCode::BAD_REQUEST, "missing 'file' field in form data");
    };

    let request = PutBlobOperationRequest {
        content,
        file_name,
        content_type,
        target_format,
    };

    match state.put_blob.run(request).await {
        Ok(result) => {
            let record = result.record;
            let resp = ApiResponse {
                success: true,
                data: Some(UploadResponse {
                    download_url: format!("/download/{}", record.id),
                    file_id: record.id,
                    file_name: record.display_name,
                    expires_at: record.expires_at,
                }),
                error: None,
            };
            (StatusCode::OK, axum::Json(resp)).into_response()
        }
        Err(error) => drift_error_response(error),
    }
}

async fn download_handler(
    State(state): State<Arc<ServerState>>,
    Path(blob_id): Path<String>,
) -> Response {
    if !id::is_well_formed(&blob_id) {
        return error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE);
    }

    let outcome = state
        .read_blob
        .run(ReadBlobOperationRequest { id: blob_id })
        .await;

    let result = match outcome {
        Ok(ReadBlobOperationOutcome::Found(result)) => result,
        Ok(ReadBlobOperationOutcome::NotFound) => {
            return error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE);
        }
        Err(error) => return drift_error_response(error),
    };

    let content_type = HeaderValue::from_str(&result.record.content_type)
        .ok()
        .filter(|_| !result.record.content_type.trim().is_empty())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = content_disposition(&result.record.display_name);
    let length = result.body.len();

    let mut response = Response::new(Body::from(result.body));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    response
}

async fn delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(blob_id): Path<String>,
) -> Response {
    match state
        .delete_blob
        .run(DeleteBlobOperationRequest { id: blob_id })
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => drift_error_response(error),
    }
}

/// `attachment; filename="..."` with quotes, backslashes and non-printable
/// characters replaced so the value is always a valid header.
fn content_disposition(display_name: &str) -> HeaderValue {
    let safe: String = display_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
