//! HTTP command handlers
//!
//! Each submodule owns the request/response types and handlers for one
//! group of routes. This module wires them into the router and converts
//! [`AppError`] into JSON error replies.

pub mod health;
pub mod llm;
pub mod process;
pub mod sessions;
pub mod translate;
pub mod tts;
pub mod upload;

use crate::domain::models::{ProcessResult, SessionRecord, StoredResult};
use crate::domain::Normalized;
use crate::error::{AppError, Result as AppResult};
use crate::AppState;
use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use std::convert::Infallible;
use tower_http::cors::{Any, CorsLayer};

pub const SESSION_ID_HEADER: &str = "x-session-id";
pub const DROPPED_KEY_TERMS_HEADER: &str = "x-dropped-key-terms";

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(SESSION_ID_HEADER),
            HeaderName::from_static(DROPPED_KEY_TERMS_HEADER),
        ]);

    Router::new()
        .route("/health", get(health::health))
        .route("/models", get(llm::list_models))
        .route("/upload", post(upload::upload_document))
        .route("/process", post(process::process_document))
        .route("/process-text", post(process::process_text))
        .route("/translate", post(translate::translate_result))
        .route("/tts", post(tts::synthesize_speech))
        .route("/sessions/:session_id", get(sessions::get_session))
        .route("/history", get(sessions::history))
        .route("/history/:session_id", delete(sessions::delete_history_entry))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// An error reply: status code plus `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("Bad request: {}", message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Map an application error, prefixing server-side failures with `context`
    pub fn from_app(error: AppError, context: &str) -> Self {
        match error {
            AppError::InvalidInput(message) => Self::bad_request(message),
            AppError::Auth(message) => Self::unauthorized(message),
            AppError::NotFound(message) => Self::not_found(message),
            other => {
                log::error!("{}: {}", context, other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{}: {}", context, other),
                )
            }
        }
    }

    pub fn processing(error: AppError) -> Self {
        Self::from_app(error, "Processing error")
    }

    pub fn translation(error: AppError) -> Self {
        Self::from_app(error, "Translation error")
    }

    pub fn speech(error: AppError) -> Self {
        Self::from_app(error, "Speech error")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The caller's user id when a valid bearer token was sent
///
/// Never rejects: a missing, malformed or refused token is anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalUser(pub Option<String>);

impl OptionalUser {
    pub fn uid(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(OptionalUser(None));
        };
        if !state.auth.is_configured() {
            return Ok(OptionalUser(None));
        }

        match state.auth.verify_token(token).await {
            Ok(uid) => Ok(OptionalUser(uid)),
            Err(e) => {
                log::warn!("Token verification failed, continuing anonymously: {}", e);
                Ok(OptionalUser(None))
            }
        }
    }
}

/// A cached session the caller may see
///
/// Sessions owned by another user read as missing.
pub fn visible_session(
    state: &AppState,
    session_id: &str,
    user: &OptionalUser,
) -> AppResult<Option<SessionRecord>> {
    Ok(state
        .sessions
        .get(session_id)?
        .filter(|record| record.visible_to(user.uid())))
}

/// ProcessResult reply carrying the session and drop-count headers
pub fn result_response(session_id: &str, outcome: Normalized) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(session_id) {
        headers.insert(HeaderName::from_static(SESSION_ID_HEADER), value);
    }
    headers.insert(
        HeaderName::from_static(DROPPED_KEY_TERMS_HEADER),
        HeaderValue::from(outcome.dropped_key_terms),
    );

    (headers, Json(outcome.result)).into_response()
}

/// Persist a result for a signed-in caller; failures are only logged
pub async fn persist_for_user(
    state: &AppState,
    user: &OptionalUser,
    session_id: &str,
    language: &str,
    result: &ProcessResult,
    translated: Option<&ProcessResult>,
) {
    let Some(uid) = user.uid() else {
        return;
    };

    let stored = StoredResult::new(
        uid.to_string(),
        session_id.to_string(),
        language.to_string(),
        result.clone(),
    )
    .with_translation(translated.cloned());

    if let Err(e) = state.storage.save_result(&stored).await {
        log::warn!("Failed to persist result for session {}: {}", session_id, e);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::adapters::session::SessionCache;
    use crate::pipeline::ProcessingPipeline;
    use crate::ports::auth::MockAuthPort;
    use crate::ports::llm::MockLlmServicePort;
    use crate::ports::mocks::MockStorage;
    use crate::ports::ocr::MockOcrServicePort;
    use crate::ports::tts::MockTtsServicePort;
    use crate::ports::LlmConfig;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Service mocks a test configures before the state is built
    pub struct Mocks {
        pub ocr: MockOcrServicePort,
        pub llm: MockLlmServicePort,
        pub tts: MockTtsServicePort,
        pub auth: MockAuthPort,
    }

    impl Default for Mocks {
        fn default() -> Self {
            let mut auth = MockAuthPort::new();
            auth.expect_is_configured().return_const(true);
            auth.expect_verify_token()
                .returning(|token| Ok((token == "good-token").then(|| "uid-1".to_string())));

            Self {
                ocr: MockOcrServicePort::new(),
                llm: MockLlmServicePort::new(),
                tts: MockTtsServicePort::new(),
                auth,
            }
        }
    }

    impl Mocks {
        pub fn build(self) -> (AppState, MockStorage) {
            let storage = MockStorage::new();
            let pipeline = ProcessingPipeline::new(
                Arc::new(self.ocr),
                Arc::new(self.llm),
                Arc::new(self.tts),
                LlmConfig::default(),
            );

            let state = AppState {
                pipeline: Arc::new(pipeline),
                sessions: Arc::new(
                    SessionCache::new(16, Duration::from_secs(60)).expect("valid capacity"),
                ),
                storage: Arc::new(storage.clone()),
                auth: Arc::new(self.auth),
                max_upload_bytes: 1024 * 1024,
            };
            (state, storage)
        }
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
        request.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        request
    }

    /// Send one request through a fresh router
    pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, headers, value)
    }
}
