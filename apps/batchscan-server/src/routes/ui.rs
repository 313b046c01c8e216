//! Browser front end
//!
//! Endpoints:
//! - GET / - Upload form
//! - POST /scan - Scan the submitted image and render the result page

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};

use crate::error::AppError;
use crate::html;
use crate::routes::scan::{read_scan_form, run_scan};
use crate::state::AppState;

/// Create the UI router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/scan", post(scan))
}

/// GET /
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(html::render_index(state.scan().pattern()))
}

/// POST /scan
///
/// Errors render as an HTML page with the user-facing message.
async fn scan(State(state): State<AppState>, multipart: Multipart) -> (StatusCode, Html<String>) {
    let result = async {
        let form = read_scan_form(multipart, state.config().server.max_upload_bytes).await?;
        run_scan(&state, &form).await
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Html(html::render_result(&outcome))),
        Err(e) => render_failure(e),
    }
}

fn render_failure(error: AppError) -> (StatusCode, Html<String>) {
    match &error {
        AppError::Scan(e) => tracing::error!("Scan error: {}", e),
        other => tracing::info!("Scan request rejected: {}", other),
    }
    (error.status_code(), Html(html::render_error(&error.user_message())))
}
