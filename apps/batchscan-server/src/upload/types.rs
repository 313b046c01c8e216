//! Upload types for image scanning

use axum::body::Bytes;
use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// MIME types accepted for scanning, with their canonical form
pub const ACCEPTED_MIME_TYPES: &[(&str, ImageKind)] = &[
    ("image/jpeg", ImageKind::Jpeg),
    ("image/jpg", ImageKind::Jpeg),
    ("image/pjpeg", ImageKind::Jpeg),
    ("image/png", ImageKind::Png),
    ("image/bmp", ImageKind::Bmp),
    ("image/x-bmp", ImageKind::Bmp),
    ("image/x-ms-bmp", ImageKind::Bmp),
    ("image/webp", ImageKind::Webp),
];

/// Content type browsers send when they cannot tell
pub const GENERIC_MIME_TYPE: &str = "application/octet-stream";

// ============================================================================
// Image Types
// ============================================================================

/// Image formats the OCR engines are fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Bmp,
    Webp,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::Webp => "image/webp",
        }
    }

    /// Look up an accepted MIME type, ignoring parameters and case
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        ACCEPTED_MIME_TYPES
            .iter()
            .find(|(name, _)| *name == essence)
            .map(|(_, kind)| *kind)
    }

    pub(crate) fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

/// A validated image upload
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Original file name, if the client sent one
    pub file_name: String,
    /// Declared (or guessed) MIME type
    pub mime_type: String,
    /// Format detected from the file contents
    pub format: ImageKind,
    pub data: Bytes,
}

impl UploadedImage {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported file type: {0}")]
    InvalidFormat(String),

    #[error("File contents are not a supported image ({0})")]
    UnrecognizedContent(String),

    #[error("Uploaded file is empty")]
    Empty,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("No image field in upload")]
    MissingImage,
}

impl UploadError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidFormat(_) | Self::UnrecognizedContent(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Empty | Self::MissingImage => StatusCode::BAD_REQUEST,
        }
    }
}
