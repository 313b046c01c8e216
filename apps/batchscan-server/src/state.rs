//! Application state management

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::batch::{BatchPattern, BatchPatternError};
use crate::config::Config;
use crate::ocr::{OcrService, OcrServiceConfig};
use crate::scan::ScanService;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to build batch pattern: {0}")]
    BatchPattern(#[from] BatchPatternError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    scan: ScanService,
    /// OCR engine, created on first use
    ocr: OnceCell<Arc<OcrService>>,
}

impl AppState {
    /// Create a new application state
    ///
    /// The OCR engine is not touched here; it is built by the first scan.
    pub fn new(config: Config) -> Result<Self, StateError> {
        Self::build(config, OnceCell::new())
    }

    /// Create a state with an already-built OCR service
    pub fn with_ocr_service(config: Config, ocr: OcrService) -> Result<Self, StateError> {
        Self::build(config, OnceCell::new_with(Some(Arc::new(ocr))))
    }

    fn build(config: Config, ocr: OnceCell<Arc<OcrService>>) -> Result<Self, StateError> {
        let pattern = BatchPattern::new(&config.batch.prefix, config.batch.suffix_length)?;
        let scan = ScanService::new(
            pattern,
            config.scan.max_concurrent_jobs,
            config.scan.cache_capacity,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner { config, scan, ocr }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the scan service
    pub fn scan(&self) -> &ScanService {
        &self.inner.scan
    }

    /// Get the OCR service, initializing it on first call
    pub async fn ocr(&self) -> Arc<OcrService> {
        self.inner
            .ocr
            .get_or_init(|| async {
                let config = OcrServiceConfig::from(&self.inner.config.ocr);
                tracing::info!(providers = ?config.providers, "Initializing OCR engine");
                Arc::new(OcrService::new(config))
            })
            .await
            .clone()
    }

    /// Whether the OCR engine has been initialized yet
    pub fn ocr_initialized(&self) -> bool {
        self.inner.ocr.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrProvider;

    #[tokio::test]
    async fn test_ocr_engine_is_lazy() {
        let state = AppState::new(Config::default()).unwrap();
        assert!(!state.ocr_initialized());

        let first = state.ocr().await;
        assert!(state.ocr_initialized());
        assert_eq!(
            first.configured_providers(),
            vec![OcrProvider::Tesseract, OcrProvider::Ollama]
        );

        let second = state.ocr().await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalid_batch_config_fails() {
        let mut config = Config::default();
        config.batch.suffix_length = 0;
        assert!(matches!(
            AppState::new(config),
            Err(StateError::BatchPattern(BatchPatternError::ZeroSuffixLength))
        ));
    }

    #[test]
    fn test_pattern_follows_config() {
        let mut config = Config::default();
        config.batch.prefix = "lot".to_string();
        config.batch.suffix_length = 6;
        let state = AppState::new(config).unwrap();
        assert_eq!(state.scan().pattern().prefix(), "lot");
        assert_eq!(state.scan().pattern().match_len(), 9);
    }
}
