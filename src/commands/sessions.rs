//! Session lookup and per-user history

use crate::commands::{visible_session, ApiError, ApiResult, OptionalUser};
use crate::domain::models::StoredResult;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GET /sessions/:session_id
///
/// Unknown, expired or foreign sessions read as `{}`.
pub async fn get_session(
    State(state): State<AppState>,
    user: OptionalUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let session = visible_session(&state, &session_id, &user).map_err(ApiError::processing)?;

    let body = match session {
        Some(record) => {
            serde_json::to_value(record).map_err(|e| ApiError::processing(e.into()))?
        }
        None => Value::Object(Default::default()),
    };
    Ok(Json(body))
}

const DEFAULT_HISTORY_LIMIT: i32 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i32>,
}

impl HistoryQuery {
    /// Requested page size, kept within 1..=100
    fn limit(&self) -> i32 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, DEFAULT_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub results: Vec<StoredResult>,
}

/// GET /history
pub async fn history(
    State(state): State<AppState>,
    user: OptionalUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let Some(uid) = user.uid() else {
        return Err(ApiError::unauthorized("Authentication required"));
    };

    let results = state
        .storage
        .list_results(uid, Some(query.limit()))
        .await
        .map_err(|e| ApiError::from_app(e, "History error"))?;

    log::debug!("Listed {} stored results", results.len());
    Ok(Json(HistoryResponse { results }))
}

/// DELETE /history/:session_id
pub async fn delete_history_entry(
    State(state): State<AppState>,
    user: OptionalUser,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let Some(uid) = user.uid() else {
        return Err(ApiError::unauthorized("Authentication required"));
    };

    let deleted = state
        .storage
        .delete_result(uid, &session_id)
        .await
        .map_err(|e| ApiError::from_app(e, "History error"))?;
    if !deleted {
        return Err(ApiError::not_found("Stored result not found"));
    }

    log::info!("Deleted stored result for session {}", session_id);
    Ok(StatusCode::NO_CONTENT)
}
