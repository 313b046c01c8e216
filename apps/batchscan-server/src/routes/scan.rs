//! Scan API routes
//!
//! Endpoints:
//! - POST /api/v1/scan - Upload an image (multipart), OCR it and extract the batch number
//! - POST /api/v1/scan/text - Extract the batch number from already-recognized text

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::ocr::OcrProvider;
use crate::scan::ScanOutcome;
use crate::state::AppState;
use crate::upload::{validate_image, UploadError, UploadedImage};

/// Create the scan router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(scan_image))
        .route("/text", post(scan_text))
}

/// Fields of a scan upload form
pub struct ScanForm {
    pub image: UploadedImage,
    /// OCR language hint (tesseract language code)
    pub language: Option<String>,
    /// Force a specific OCR provider
    pub provider: Option<OcrProvider>,
}

/// Read a multipart scan form
///
/// Expects an `image` file field, with optional `language` and `provider`
/// text fields. Unknown fields are ignored.
pub async fn read_scan_form(mut multipart: Multipart, max_size: usize) -> Result<ScanForm> {
    let mut image = None;
    let mut language = None;
    let mut provider = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;

                // Browsers submit an empty part when no file was chosen
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                image = Some(validate_image(&file_name, content_type.as_deref(), data, max_size)?);
            }
            "language" => {
                let value = field.text().await?;
                language = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            "provider" => {
                let value = field.text().await?;
                provider = parse_provider(&value)?;
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    let image = image.ok_or(AppError::Upload(UploadError::MissingImage))?;

    Ok(ScanForm {
        image,
        language,
        provider,
    })
}

/// Parse a provider name; empty means "any"
fn parse_provider(value: &str) -> Result<Option<OcrProvider>> {
    match value.trim().to_lowercase().as_str() {
        "" | "auto" => Ok(None),
        "tesseract" => Ok(Some(OcrProvider::Tesseract)),
        "ollama" => Ok(Some(OcrProvider::Ollama)),
        other => Err(AppError::BadRequest(format!("Unknown OCR provider: {}", other))),
    }
}

/// Run a scan for a parsed form
pub async fn run_scan(state: &AppState, form: &ScanForm) -> Result<ScanOutcome> {
    let ocr = state.ocr().await;
    let outcome = state
        .scan()
        .scan(&ocr, &form.image, form.language.as_deref(), form.provider)
        .await?;
    Ok(outcome)
}

/// POST /api/v1/scan
async fn scan_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ScanOutcome>> {
    let form = read_scan_form(multipart, state.config().server.max_upload_bytes).await?;
    Ok(Json(run_scan(&state, &form).await?))
}

/// Request body for text-only matching
#[derive(Debug, Deserialize)]
pub struct ScanTextRequest {
    /// Recognized text; may be null
    #[serde(default)]
    pub text: Option<String>,
}

/// POST /api/v1/scan/text
async fn scan_text(
    State(state): State<AppState>,
    Json(request): Json<ScanTextRequest>,
) -> Json<ScanOutcome> {
    Json(state.scan().match_text(request.text.as_deref()))
}
