//! Service health and configuration status

use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

/// Whether each backing service is usable
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub ocr: bool,
    pub llm: bool,
    pub tts: bool,
    pub auth: bool,
    pub storage: bool,
    /// Where grounding definitions come from, if anywhere
    pub knowledge: Option<&'static str>,
    pub normalize_mode: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub services: ServiceStatus,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage = match state.storage.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Storage ping failed: {}", e);
            false
        }
    };

    let pipeline = &state.pipeline;
    Json(HealthResponse {
        status: if storage { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        services: ServiceStatus {
            ocr: pipeline.ocr().is_configured(),
            llm: pipeline.llm().is_configured(),
            tts: pipeline.tts().is_configured(),
            auth: state.auth.is_configured(),
            storage,
            knowledge: pipeline.knowledge_source(),
            normalize_mode: pipeline.mode().to_string(),
        },
    })
}
