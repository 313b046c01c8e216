//! OCR Module
//!
//! Invokes an external OCR engine over uploaded images.
//!
//! Supports multiple backends:
//! - Tesseract (local, requires the `tesseract` binary)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use batchscan_server::ocr::{OcrService, OcrServiceConfig};
//!
//! let service = OcrService::new(OcrServiceConfig::default());
//!
//! // Check available providers
//! let providers = service.available_providers().await;
//!
//! // Recognize with the first provider that works
//! let result = service.recognize(&png_bytes, None, Some("eng")).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider, TesseractProvider};
pub use service::{OcrService, OcrServiceConfig};
pub use types::{OcrError, OcrProvider, OcrResult};

#[cfg(test)]
pub(crate) use provider::{mock_providers, MockProvider};
