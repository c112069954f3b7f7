//! Text-to-speech

use crate::commands::{visible_session, ApiError, ApiResult, OptionalUser};
use crate::domain::models::AudioClip;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Request to read paragraphs aloud
///
/// Explicit `paragraphs` win; otherwise the session's latest result summary
/// is split into paragraphs.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub session_id: Option<String>,
    pub paragraphs: Option<Vec<String>>,
    pub voice_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub clips: Vec<AudioClip>,
}

fn paragraphs_for(
    state: &AppState,
    user: &OptionalUser,
    request: &TtsRequest,
) -> ApiResult<Vec<String>> {
    if let Some(paragraphs) = &request.paragraphs {
        return Ok(paragraphs.clone());
    }

    let Some(session_id) = request.session_id.as_deref() else {
        return Err(ApiError::bad_request("session_id or paragraphs is required"));
    };

    let session = visible_session(state, session_id, user)
        .map_err(ApiError::speech)?
        .ok_or_else(|| ApiError::not_found("Session not found or empty"))?;

    session
        .latest_result()
        .map(|result| result.summary_paragraphs())
        .ok_or_else(|| ApiError::not_found("Session not found or empty"))
}

/// POST /tts
pub async fn synthesize_speech(
    State(state): State<AppState>,
    user: OptionalUser,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> ApiResult<Json<TtsResponse>> {
    let Json(request) = payload?;
    let paragraphs = paragraphs_for(&state, &user, &request)?;

    log::info!("Synthesizing speech for {} paragraphs", paragraphs.len());

    let clips = state
        .pipeline
        .synthesize(&paragraphs, request.voice_id.as_deref())
        .await
        .map_err(ApiError::speech)?;

    Ok(Json(TtsResponse { clips }))
}
