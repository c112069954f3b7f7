//! Language model listing

use crate::commands::{ApiError, ApiResult};
use crate::ports::llm::ModelInfo;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

/// Response containing available models
#[derive(Debug, Serialize)]
pub struct FetchModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// GET /models
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<FetchModelsResponse>> {
    let llm = state.pipeline.llm();
    log::info!("Fetching models for provider: {}", llm.provider_name());

    let models = llm
        .fetch_available_models()
        .await
        .map_err(|e| ApiError::from_app(e, "Model listing error"))?;

    log::info!(
        "Successfully fetched {} models for {}",
        models.len(),
        llm.provider_name()
    );

    Ok(Json(FetchModelsResponse { models }))
}
