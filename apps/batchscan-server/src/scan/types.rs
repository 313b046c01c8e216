//! Scan types

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::BatchMatch;
use crate::ocr::{OcrError, OcrProvider};

pub const MESSAGE_FOUND: &str = "Batch number found";
pub const MESSAGE_NOT_FOUND: &str = "Batch number not found";
pub const MESSAGE_INVALID_UPLOAD: &str = "Please upload a valid image file (JPEG, PNG, BMP, WEBP).";
pub const MESSAGE_OCR_FAILED: &str = "Error processing image. Please try again.";

/// Result of scanning one image (or one block of text)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub found: bool,
    /// First matching batch number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    /// Line the batch number was found on (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Every batch number candidate in the text
    pub candidates: Vec<BatchMatch>,
    pub message: &'static str,
    /// Text recognized by the OCR engine
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<OcrProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// SHA-256 of the scanned image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_sha256: Option<String>,
    /// Whether OCR output came from the result cache
    pub cached: bool,
    pub elapsed_ms: u64,
    pub scanned_at: DateTime<Utc>,
}

/// Failures after an upload has been accepted
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Scan queue closed")]
    QueueClosed,
}

impl ScanError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::Ocr(e) => e.status_code(),
            Self::QueueClosed => axum::http::StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
