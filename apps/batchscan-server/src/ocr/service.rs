//! OCR Service
//!
//! Orchestrates OCR providers: preferred provider selection and fallback.

use std::sync::Arc;
use std::time::Duration;

use super::{
    provider::{OcrProviderTrait, OllamaProvider, TesseractProvider},
    types::{OcrError, OcrProvider, OcrResult},
};
use crate::config::OcrConfig;

/// OCR service configuration
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    /// Preferred provider order
    pub providers: Vec<OcrProvider>,
    /// Tesseract binary
    pub tesseract_bin: String,
    /// Tesseract page segmentation mode
    pub tesseract_psm: u8,
    /// Ollama base URL
    pub ollama_url: String,
    /// Ollama model name
    pub ollama_model: String,
    /// Default OCR language
    pub default_language: String,
    /// Per-call timeout
    pub timeout: Duration,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            providers: vec![OcrProvider::Tesseract, OcrProvider::Ollama],
            tesseract_bin: "tesseract".to_string(),
            tesseract_psm: 3,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
            default_language: "eng".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&OcrConfig> for OcrServiceConfig {
    fn from(config: &OcrConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            tesseract_bin: config.tesseract_bin.clone(),
            tesseract_psm: config.tesseract_psm,
            ollama_url: config.ollama_url.clone(),
            ollama_model: config.ollama_model.clone(),
            default_language: config.default_language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// OCR service for recognizing text in uploaded images
pub struct OcrService {
    config: OcrServiceConfig,
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a new OCR service with providers built from the configuration
    pub fn new(config: OcrServiceConfig) -> Self {
        let mut providers: Vec<Arc<dyn OcrProviderTrait>> = Vec::new();

        for provider in &config.providers {
            match provider {
                OcrProvider::Tesseract => providers.push(Arc::new(TesseractProvider::new(
                    &config.tesseract_bin,
                    &config.default_language,
                    config.tesseract_psm,
                    config.timeout,
                ))),
                OcrProvider::Ollama => providers.push(Arc::new(OllamaProvider::new(
                    &config.ollama_url,
                    &config.ollama_model,
                    config.timeout,
                ))),
            }
        }

        Self { config, providers }
    }

    /// Create a service over an explicit provider list
    pub fn with_providers(config: OcrServiceConfig, providers: Vec<Arc<dyn OcrProviderTrait>>) -> Self {
        Self { config, providers }
    }

    /// Configured providers, in fallback order
    pub fn configured_providers(&self) -> Vec<OcrProvider> {
        self.providers.iter().map(|p| p.provider_type()).collect()
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Perform OCR on an image
    pub async fn recognize(
        &self,
        image_data: &[u8],
        preferred_provider: Option<OcrProvider>,
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.config.default_language);

        // If a specific provider is requested, only that one is tried
        if let Some(preferred) = preferred_provider {
            let provider = self
                .providers
                .iter()
                .find(|p| p.provider_type() == preferred)
                .ok_or_else(|| {
                    OcrError::ProviderNotAvailable(format!("{} provider is not configured", preferred))
                })?;

            if !provider.is_available().await {
                return Err(OcrError::ProviderNotAvailable(format!(
                    "{} provider is not available",
                    preferred
                )));
            }
            return provider.recognize(image_data, Some(lang)).await;
        }

        // Try providers in order, remembering the last failure
        let mut last_error = None;
        for provider in &self.providers {
            if !provider.is_available().await {
                tracing::debug!(provider = %provider.provider_type(), "OCR provider unavailable, skipping");
                continue;
            }
            match provider.recognize(image_data, Some(lang)).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::ProviderNotAvailable("No OCR providers available".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{mock_providers, MockProvider};

    #[tokio::test]
    async fn test_ocr_service_creation() {
        let service = OcrService::new(OcrServiceConfig::default());
        assert_eq!(
            service.configured_providers(),
            vec![OcrProvider::Tesseract, OcrProvider::Ollama]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let failing = Arc::new(MockProvider::failing("engine crashed"));
        let working = Arc::new(MockProvider {
            provider: OcrProvider::Ollama,
            ..MockProvider::returning("medplusABC123456789")
        });
        let service = OcrService::with_providers(
            OcrServiceConfig::default(),
            mock_providers(&[failing.clone(), working.clone()]),
        );

        let result = service.recognize(b"img", None, None).await.unwrap();
        assert_eq!(result.provider, OcrProvider::Ollama);
        assert_eq!(failing.calls(), 1);
        assert_eq!(working.calls(), 1);
    }

    #[tokio::test]
    async fn test_skips_unavailable_provider() {
        let offline = Arc::new(MockProvider {
            available: false,
            ..MockProvider::returning("never")
        });
        let online = Arc::new(MockProvider {
            provider: OcrProvider::Ollama,
            ..MockProvider::returning("text")
        });
        let service = OcrService::with_providers(
            OcrServiceConfig::default(),
            mock_providers(&[offline.clone(), online]),
        );

        assert_eq!(service.available_providers().await, vec![OcrProvider::Ollama]);
        let result = service.recognize(b"img", None, None).await.unwrap();
        assert_eq!(result.text, "text");
        assert_eq!(offline.calls(), 0);
    }

    #[tokio::test]
    async fn test_reports_last_failure() {
        let service = OcrService::with_providers(
            OcrServiceConfig::default(),
            mock_providers(&[Arc::new(MockProvider::failing("bad image"))]),
        );
        let result = service.recognize(b"img", None, None).await;
        assert!(matches!(result, Err(OcrError::ProcessingError(msg)) if msg == "bad image"));
    }

    #[tokio::test]
    async fn test_no_providers() {
        let service = OcrService::with_providers(OcrServiceConfig::default(), vec![]);
        let result = service.recognize(b"img", None, None).await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_preferred_provider_not_configured() {
        let service = OcrService::with_providers(
            OcrServiceConfig::default(),
            mock_providers(&[Arc::new(MockProvider::returning("text"))]),
        );
        let result = service
            .recognize(b"img", Some(OcrProvider::Ollama), None)
            .await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_preferred_provider_does_not_fall_back() {
        let preferred = Arc::new(MockProvider {
            provider: OcrProvider::Ollama,
            ..MockProvider::failing("model missing")
        });
        let other = Arc::new(MockProvider::returning("text"));
        let service = OcrService::with_providers(
            OcrServiceConfig::default(),
            mock_providers(&[other.clone(), preferred]),
        );
        let result = service
            .recognize(b"img", Some(OcrProvider::Ollama), None)
            .await;
        assert!(result.is_err());
        assert_eq!(other.calls(), 0);
    }
}
