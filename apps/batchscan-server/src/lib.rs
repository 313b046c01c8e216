//! Batchscan Server Library
//!
//! Upload a label photo, run it through an external OCR engine and pull out
//! the batch number (`medplus` followed by 12 letters or digits by default).
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `batch`: Batch number pattern matching
//! - `upload`: Image upload validation
//! - `ocr`: OCR providers (Tesseract, Ollama) and provider fallback
//! - `scan`: End-to-end scan with job serialization and result cache
//! - `routes` / `html`: HTTP API and browser pages

pub mod batch;
pub mod config;
pub mod error;
pub mod html;
pub mod ocr;
pub mod routes;
pub mod scan;
pub mod state;
pub mod upload;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Headroom for multipart boundaries and text fields on top of the image limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().server.max_upload_bytes + MULTIPART_OVERHEAD;

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/health", get(routes::health::health_check))
        .merge(routes::ui::router())
        .nest("/api/v1/scan", routes::scan::router())
        .nest("/api/v1/ocr", routes::ocr::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
