//! REST API for imgops-web
//!
//! Provides the operation catalog and a JSON processing endpoint.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use imgops_web_protocol::ParamFormRenderer;

use crate::config::Config;
use crate::processing::{process_image, ParamValues, ProcessError};
use crate::storage::{SavedUpload, Storage, StorageError};

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<ParamFormRenderer>,
    pub storage: Storage,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, renderer: ParamFormRenderer) -> Self {
        Self {
            storage: Storage::new(&config.storage),
            renderer: Arc::new(renderer),
            config: Arc::new(config),
        }
    }
}

/// Fields of a multipart processing request
#[derive(Debug, Default)]
pub struct Submission {
    /// Original filename and content of the `image` part
    pub image: Option<(String, Vec<u8>)>,
    pub operation: Option<String>,
    /// Every other text field
    pub params: ParamValues,
}

/// Collect the parts of a processing form
pub async fn read_submission(mut multipart: Multipart) -> anyhow::Result<Submission> {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                submission.image = Some((filename, data.to_vec()));
            }
            "operation" => {
                submission.operation = Some(field.text().await?).filter(|op| !op.is_empty());
            }
            _ => {
                let value = field.text().await?;
                submission.params.insert(name, value);
            }
        }
    }

    Ok(submission)
}

/// Store the upload and run the operation on a blocking thread.
///
/// Returns the result id, which is also the upload id.
pub async fn run_submission(
    storage: &Storage,
    filename: &str,
    data: &[u8],
    operation: String,
    params: ParamValues,
) -> Result<String, SubmitError> {
    let SavedUpload { id, path } = storage.save_upload(filename, data).await?;
    let output = storage.result_path(&id)?;

    tracing::info!(id = %id, operation = %operation, params = params.len(), "Processing image");
    tokio::task::spawn_blocking(move || process_image(&path, &output, &operation, &params))
        .await
        .map_err(|e| SubmitError::Join(e.to_string()))??;

    Ok(id)
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("Processing task failed: {0}")]
    Join(String),
}

// Routes
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/operations", get(list_operations))
        .route("/process", post(process))
}

// Handlers

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn list_operations(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.renderer.operations().to_json(),
    )
}

async fn process(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    let submission = match read_submission(multipart).await {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            );
        }
    };

    let (Some((filename, data)), Some(operation)) = (submission.image, submission.operation) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "image or operation missing" })),
        );
    };

    match run_submission(&state.storage, &filename, &data, operation, submission.params).await {
        Ok(id) => {
            let filename = format!("{id}.png");
            let path = format!("/results/{filename}");
            let result_path = headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map_or_else(|| path.clone(), |host| format!("http://{host}{path}"));
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "result_path": result_path,
                    "local_result_filename": filename,
                })),
            )
        }
        Err(SubmitError::Storage(StorageError::UnsupportedType)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "image or operation missing" })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}
