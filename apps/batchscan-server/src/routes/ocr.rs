//! OCR engine routes

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::OcrProvider;
use crate::state::AppState;

/// Create the OCR router
pub fn router() -> Router<AppState> {
    Router::new().route("/providers", get(list_providers))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersResponse {
    /// Providers in fallback order
    pub configured: Vec<OcrProvider>,
    /// Providers currently reachable
    pub available: Vec<OcrProvider>,
    pub default_language: String,
}

/// GET /api/v1/ocr/providers
async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let ocr = state.ocr().await;
    Json(ProvidersResponse {
        configured: ocr.configured_providers(),
        available: ocr.available_providers().await,
        default_language: state.config().ocr.default_language.clone(),
    })
}
