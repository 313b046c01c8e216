//! Image upload validation
//!
//! Uploads are checked before any OCR work starts: declared MIME type against
//! the allowlist, then the leading bytes against known image signatures.

use axum::body::Bytes;

use super::types::{ImageKind, UploadError, UploadedImage, GENERIC_MIME_TYPE};

/// Resolve the MIME type of an upload
///
/// Uses the declared content type unless it is missing or generic, in which
/// case the type is guessed from the file name.
pub fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) if !mime.eq_ignore_ascii_case(GENERIC_MIME_TYPE) => mime.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(GENERIC_MIME_TYPE)
            .to_string(),
    }
}

/// Validate an uploaded image
pub fn validate_image(
    file_name: &str,
    declared_mime: Option<&str>,
    data: Bytes,
    max_size: usize,
) -> Result<UploadedImage, UploadError> {
    let mime_type = resolve_mime_type(declared_mime, file_name);

    let declared_kind =
        ImageKind::from_mime(&mime_type).ok_or_else(|| UploadError::InvalidFormat(mime_type.clone()))?;

    if data.is_empty() {
        return Err(UploadError::Empty);
    }

    if data.len() > max_size {
        return Err(UploadError::TooLarge {
            size: data.len(),
            max: max_size,
        });
    }

    let detected = image::guess_format(&data)
        .map_err(|_| UploadError::UnrecognizedContent("unknown signature".to_string()))?;

    let format = ImageKind::from_image_format(detected)
        .ok_or_else(|| UploadError::UnrecognizedContent(format!("{:?}", detected)))?;

    if format != declared_kind {
        tracing::debug!(
            file_name = %file_name,
            declared = %mime_type,
            detected = format.mime_type(),
            "Declared image type differs from contents"
        );
    }

    Ok(UploadedImage {
        file_name: file_name.to_string(),
        mime_type,
        format,
        data,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Smallest byte prefixes `image::guess_format` recognizes
    pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
    pub const BMP: &[u8] = b"BM\x36\0\0\0\0\0\0\0";
    pub const WEBP: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";
    pub const GIF: &[u8] = b"GIF89a\x01\0\x01\0";
}
