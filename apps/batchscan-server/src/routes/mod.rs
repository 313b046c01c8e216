//! Route modules for Batchscan Server

pub mod health;
pub mod ocr;
pub mod scan;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::Router;
    use axum_test::TestServer;

    use crate::config::Config;
    use crate::ocr::{mock_providers, MockProvider, OcrService, OcrServiceConfig};
    use crate::state::AppState;

    /// Application router backed by a mock OCR engine
    pub fn test_app(mock: &Arc<MockProvider>) -> Router {
        let config = Config::default();
        let ocr = OcrService::with_providers(
            OcrServiceConfig::from(&config.ocr),
            mock_providers(&[mock.clone()]),
        );
        let state = AppState::with_ocr_service(config, ocr).expect("valid default config");
        crate::app(state)
    }

    pub fn test_server(mock: &Arc<MockProvider>) -> TestServer {
        TestServer::new(test_app(mock)).expect("test server")
    }
}
