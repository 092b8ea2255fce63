//! Browser-facing routes: the form, processing redirects, results and assets

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Response, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{self, read_submission, run_submission, AppState};
use crate::embedded;
use crate::pages;
use crate::storage::{allowed_file, Storage};

/// Redirect back to the form with a message shown as an alert
fn back_with_error(message: &str) -> Redirect {
    Redirect::to(&format!("/?error={}", urlencoding::encode(message)))
}

#[derive(Deserialize)]
struct IndexQuery {
    error: Option<String>,
}

async fn index(State(state): State<AppState>, Query(query): Query<IndexQuery>) -> Html<String> {
    Html(pages::render_index(&state.renderer, query.error.as_deref()))
}

async fn process(State(state): State<AppState>, multipart: Multipart) -> Redirect {
    let submission = match read_submission(multipart).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed upload");
            return back_with_error("No file part provided");
        }
    };

    let Some((filename, data)) = submission.image else {
        return back_with_error("No file part provided");
    };
    if filename.is_empty() {
        return back_with_error("No selected file");
    }
    if !allowed_file(&filename) {
        return back_with_error("Unsupported file type");
    }

    let operation = submission.operation.unwrap_or_else(|| "grayscale".to_string());
    match run_submission(&state.storage, &filename, &data, operation, submission.params).await {
        Ok(id) => Redirect::to(&format!("/result/{id}")),
        Err(e) => {
            tracing::error!(error = %e, "Processing failed");
            back_with_error(&format!("Processing failed: {e}"))
        }
    }
}

async fn result(State(state): State<AppState>, Path(id): Path<String>) -> axum::response::Response {
    let (Some(_), Ok(id)) = (state.storage.existing_result(&id), Storage::canonical_id(&id)) else {
        return back_with_error("Result not found").into_response();
    };
    let image_url = format!("/results/{id}.png");
    Html(pages::render_result(&id, &image_url)).into_response()
}

async fn download(State(state): State<AppState>, Path(id): Path<String>) -> Response<Body> {
    let (Some(path), Ok(id)) = (state.storage.existing_result(&id), Storage::canonical_id(&id)) else {
        return not_found();
    };
    match tokio::fs::read(&path).await {
        Ok(data) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/png")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}.png\""),
            )
            .body(Body::from(data))
            .unwrap_or_else(|_| not_found()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read result");
            not_found()
        }
    }
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Serve embedded `static/` and `pkg/` files
async fn serve_asset(uri: Uri) -> Response<Body> {
    match embedded::get_asset(uri.path()) {
        Some((data, mime)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime)
            .header(header::CACHE_CONTROL, "public, max-age=3600")
            .body(Body::from(data))
            .unwrap_or_else(|_| not_found()),
        None => not_found(),
    }
}

/// The full application router
pub fn app(state: AppState) -> Router {
    let results_dir = state.storage.results_dir().to_path_buf();
    let upload_dir = state.storage.upload_dir().to_path_buf();
    let body_limit = state.config.limits.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/process", post(process))
        .route("/result/:id", get(result))
        .route("/download/:id", get(download))
        .route("/static/*path", get(serve_asset))
        .route("/pkg/*path", get(serve_asset))
        .nest_service("/results", ServeDir::new(results_dir))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .nest("/api", api::api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
