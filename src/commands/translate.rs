//! Result translation

use crate::commands::{
    persist_for_user, result_response, visible_session, ApiError, ApiResult, OptionalUser,
};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

/// Request to translate a session's result
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub session_id: String,
    pub target_language: String,
}

/// POST /translate
///
/// Always translates the original result, never an earlier translation.
pub async fn translate_result(
    State(state): State<AppState>,
    user: OptionalUser,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let target_language = request.target_language.trim().to_string();
    if target_language.is_empty() {
        return Err(ApiError::bad_request("target_language must not be empty"));
    }

    let session =
        visible_session(&state, &request.session_id, &user).map_err(ApiError::translation)?;
    let Some(original) = session.and_then(|s| s.result) else {
        return Err(ApiError::not_found("Session not found or empty"));
    };

    log::info!(
        "Translating session {} into {}",
        request.session_id,
        target_language
    );

    let outcome = state
        .pipeline
        .translate(&original, &target_language)
        .await
        .map_err(ApiError::translation)?;

    let translated = outcome.result.clone();
    let updated = state
        .sessions
        .update(&request.session_id, |record| {
            record.result_translated = Some(translated.clone());
            record.language = target_language.clone();
        })
        .map_err(ApiError::translation)?;
    if updated.is_none() {
        log::warn!(
            "Session {} expired during translation; result not cached",
            request.session_id
        );
    }

    persist_for_user(
        &state,
        &user,
        &request.session_id,
        &target_language,
        &original,
        Some(&translated),
    )
    .await;

    Ok(result_response(&request.session_id, outcome))
}
