//! Error types for the Batchscan server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::scan::{ScanError, MESSAGE_INVALID_UPLOAD, MESSAGE_OCR_FAILED};
use crate::upload::UploadError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(e) => e.status_code(),
            AppError::Scan(e) => e.status_code(),
            AppError::Multipart(e) => e.status(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Upload(UploadError::TooLarge { .. }) => "payload_too_large",
            AppError::Upload(UploadError::Empty | UploadError::MissingImage) => "missing_image",
            AppError::Upload(_) => "unsupported_media_type",
            AppError::Scan(ScanError::Ocr(crate::ocr::OcrError::ProviderNotAvailable(_))) => {
                "ocr_unavailable"
            }
            AppError::Scan(_) => "ocr_failed",
            AppError::Multipart(_) => "bad_multipart",
        }
    }

    /// Message safe to show to end users
    ///
    /// OCR failures collapse to one generic message; the cause is only logged.
    pub fn user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Upload(UploadError::TooLarge { max, .. }) => {
                format!("Image is too large. The limit is {} bytes.", max)
            }
            AppError::Upload(UploadError::Empty | UploadError::MissingImage) => {
                "Please choose an image to upload.".to_string()
            }
            AppError::Upload(_) => MESSAGE_INVALID_UPLOAD.to_string(),
            AppError::Scan(_) => MESSAGE_OCR_FAILED.to_string(),
            AppError::Multipart(e) => e.body_text(),
        }
    }

    fn log(&self) {
        match self {
            AppError::Scan(e) => tracing::error!("Scan error: {}", e),
            AppError::Upload(e) => tracing::info!("Upload rejected: {}", e),
            AppError::Multipart(e) => tracing::warn!("Multipart error: {}", e),
            AppError::BadRequest(msg) => tracing::debug!("Bad request: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message: self.user_message(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrError;

    #[test]
    fn test_upload_errors_map_to_invalid_format_message() {
        let err = AppError::from(UploadError::InvalidFormat("application/pdf".to_string()));
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.code(), "unsupported_media_type");
        assert_eq!(err.user_message(), MESSAGE_INVALID_UPLOAD);
    }

    #[test]
    fn test_ocr_errors_hide_cause() {
        let err = AppError::from(ScanError::from(OcrError::ProcessingError(
            "Tesseract failed: leptonica could not read /tmp/ocr_input".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "ocr_failed");
        assert_eq!(err.user_message(), MESSAGE_OCR_FAILED);
        assert!(!err.user_message().contains("/tmp"));
    }

    #[test]
    fn test_missing_engine_is_unavailable() {
        let err = AppError::from(ScanError::from(OcrError::ProviderNotAvailable(
            "No OCR providers available".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "ocr_unavailable");
        assert_eq!(err.user_message(), MESSAGE_OCR_FAILED);
    }

    #[test]
    fn test_too_large() {
        let err = AppError::from(UploadError::TooLarge { size: 20, max: 10 });
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.user_message().contains("10 bytes"));
    }
}
