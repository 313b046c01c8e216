//! Image upload handling
//!
//! Validates uploads before they reach the OCR engine:
//! - Declared MIME type must be JPEG, PNG, BMP or WEBP
//! - Contents must carry one of those image signatures
//! - Size must be within the configured limit

pub mod types;
pub mod validation;

pub use types::{ImageKind, UploadError, UploadedImage, ACCEPTED_MIME_TYPES};
pub use validation::{resolve_mime_type, validate_image};
