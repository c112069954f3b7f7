//! Document and text processing

use crate::commands::{
    persist_for_user, result_response, visible_session, ApiError, ApiResult, OptionalUser,
};
use crate::domain::models::{DocumentSource, SessionRecord};
use crate::domain::Normalized;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

fn default_language() -> String {
    "en".to_string()
}

/// Request to explain a stored or uploaded document
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// Session created by `/upload` (or an earlier `/process`)
    pub session_id: Option<String>,
    /// Document already in cloud storage (`gs://bucket/object`)
    pub gcs_uri: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Request to explain caller-supplied text
#[derive(Debug, Deserialize)]
pub struct ProcessTextRequest {
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn validated_language(language: &str) -> ApiResult<String> {
    let language = language.trim();
    if language.is_empty() {
        return Err(ApiError::bad_request("language must not be empty"));
    }
    Ok(language.to_string())
}

/// Find or create the session a process request refers to
fn resolve_session(
    state: &AppState,
    user: &OptionalUser,
    request: &ProcessRequest,
) -> ApiResult<(SessionRecord, DocumentSource)> {
    let gcs_uri = request
        .gcs_uri
        .as_deref()
        .map(str::trim)
        .filter(|uri| !uri.is_empty());
    if let Some(uri) = gcs_uri {
        if !uri.starts_with("gs://") {
            return Err(ApiError::bad_request("gcs_uri must start with gs://"));
        }
    }

    let record = match request.session_id.as_deref() {
        Some(session_id) => visible_session(state, session_id, user)
            .map_err(ApiError::processing)?
            .ok_or_else(|| ApiError::not_found("Session not found"))?,
        None if gcs_uri.is_some() => SessionRecord::new(request.language.clone()),
        None => return Err(ApiError::bad_request("session_id or gcs_uri is required")),
    };

    let record = match gcs_uri {
        Some(uri) => record.with_source_uri(Some(uri.to_string())),
        None => record,
    };

    // An explicit URI wins over an earlier upload
    let source = match gcs_uri {
        Some(uri) => DocumentSource::Gcs {
            uri: uri.to_string(),
        },
        None => record
            .document_source()
            .ok_or_else(|| ApiError::bad_request("session has no document"))?,
    };

    Ok((record, source))
}

/// Cache the outcome on the session, persist it, and build the reply
async fn finish(
    state: &AppState,
    user: &OptionalUser,
    mut record: SessionRecord,
    language: String,
    outcome: Normalized,
) -> ApiResult<Response> {
    record.language = language;
    record.result = Some(outcome.result.clone());
    record.result_translated = None;
    record.dropped_key_terms = outcome.dropped_key_terms;
    if user.uid().is_some() {
        record.owner_uid = user.0.clone();
    }

    let session_id = record.session_id.clone();
    let language = record.language.clone();
    state
        .sessions
        .insert(record)
        .map_err(ApiError::processing)?;

    persist_for_user(state, user, &session_id, &language, &outcome.result, None).await;

    Ok(result_response(&session_id, outcome))
}

/// POST /process
pub async fn process_document(
    State(state): State<AppState>,
    user: OptionalUser,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let language = validated_language(&request.language)?;
    let (record, source) = resolve_session(&state, &user, &request)?;

    log::info!(
        "Processing session {} from {} into {}",
        record.session_id,
        source,
        language
    );

    let outcome = state
        .pipeline
        .process_document(&source, &language)
        .await
        .map_err(ApiError::processing)?;

    finish(&state, &user, record, language, outcome).await
}

/// POST /process-text
pub async fn process_text(
    State(state): State<AppState>,
    user: OptionalUser,
    payload: Result<Json<ProcessTextRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let language = validated_language(&request.language)?;
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }

    let record = SessionRecord::new(language.clone());
    log::info!(
        "Processing {} characters of text for session {}",
        request.text.len(),
        record.session_id
    );

    let outcome = state
        .pipeline
        .process_text(&request.text, &language)
        .await
        .map_err(ApiError::processing)?;

    finish(&state, &user, record, language, outcome).await
}

#[cfg(test)]
mod tests {
    use crate::commands::test_support::*;
    use crate::commands::{DROPPED_KEY_TERMS_HEADER, SESSION_ID_HEADER};
    use crate::domain::models::{DocumentSource, SessionRecord, UploadedDocument};
    use crate::error::AppError;
    use crate::ports::storage::StoragePort;
    use axum::http::StatusCode;
    use serde_json::json;

    fn llm_reply(mocks: &mut Mocks, reply: serde_json::Value) {
        mocks
            .llm
            .expect_generate_json()
            .returning(move |_, _| Ok(reply.clone()));
    }

    #[tokio::test]
    async fn test_process_uploaded_session() {
        let mut mocks = Mocks::default();
        mocks
            .ocr
            .expect_extract_text()
            .withf(|source| matches!(source, DocumentSource::Inline { mime_type, .. } if mime_type == "image/png"))
            .times(1)
            .returning(|_| Ok("Hemoglobin 9.1 g/dL".to_string()));
        llm_reply(
            &mut mocks,
            json!({
                "plain_summary": "Your blood count is low.",
                "key_terms": [{"term": "Hemoglobin", "definition": "Carries oxygen"}, 7],
                "red_flags": ["Feeling faint"]
            }),
        );
        let (state, storage) = mocks.build();

        let record = SessionRecord::new("en").with_document(UploadedDocument {
            file_name: Some("cbc.png".to_string()),
            mime_type: "image/png".to_string(),
            bytes: b"png-bytes".to_vec(),
        });
        let session_id = record.session_id.clone();
        state.sessions.insert(record).unwrap();

        let request = json_request(
            "POST",
            "/process",
            json!({"session_id": session_id, "language": "es"}),
        );
        let (status, headers, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[SESSION_ID_HEADER], session_id.as_str());
        assert_eq!(headers[DROPPED_KEY_TERMS_HEADER], "1");
        assert_eq!(body["plain_summary"], "Your blood count is low.");
        assert_eq!(body["key_terms"], json!([{"term": "Hemoglobin", "definition": "Carries oxygen"}]));
        assert_eq!(body["action_items"], json!([]));
        assert_eq!(body["red_flags"], json!(["Feeling faint"]));
        assert_eq!(body["disclaimers"].as_array().unwrap().len(), 1);

        let cached = state.sessions.get(&session_id).unwrap().unwrap();
        assert_eq!(cached.language, "es");
        assert_eq!(cached.dropped_key_terms, 1);
        assert!(cached.result.is_some());

        // Anonymous callers are never persisted
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn test_process_gcs_uri_persists_for_user() {
        let mut mocks = Mocks::default();
        mocks
            .ocr
            .expect_extract_text()
            .withf(|source| *source == DocumentSource::Gcs { uri: "gs://bucket/uploads/a.pdf".to_string() })
            .returning(|_| Ok("Creatinine 1.9".to_string()));
        llm_reply(&mut mocks, json!({"plain_summary": "Kidney numbers are high."}));
        let (state, storage) = mocks.build();

        let request = with_token(
            json_request("POST", "/process", json!({"gcs_uri": "gs://bucket/uploads/a.pdf"})),
            "good-token",
        );
        let (status, headers, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plain_summary"], "Kidney numbers are high.");

        let session_id = headers[SESSION_ID_HEADER].to_str().unwrap();
        let stored = storage.get_result("uid-1", session_id).await.unwrap().unwrap();
        assert_eq!(stored.language, "en");
        assert_eq!(stored.result.plain_summary, "Kidney numbers are high.");
    }

    #[tokio::test]
    async fn test_process_requires_a_document() {
        let (state, _) = Mocks::default().build();

        let (status, _, body) = send(&state, json_request("POST", "/process", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad request: session_id or gcs_uri is required");

        let (status, _, _) = send(
            &state,
            json_request("POST", "/process", json!({"gcs_uri": "https://example.com/a.pdf"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = send(
            &state,
            json_request("POST", "/process", json!({"session_id": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session not found");
    }

    #[tokio::test]
    async fn test_process_ocr_failure_is_processing_error() {
        let mut mocks = Mocks::default();
        mocks
            .ocr
            .expect_extract_text()
            .returning(|_| Err(AppError::Ocr("image too blurry".to_string())));
        let (state, _) = mocks.build();

        let request = json_request("POST", "/process", json!({"gcs_uri": "gs://b/scan.png"}));
        let (status, _, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Processing error: OCR service error: image too blurry");
    }

    #[tokio::test]
    async fn test_process_text() {
        let mut mocks = Mocks::default();
        mocks
            .llm
            .expect_generate_json()
            .withf(|prompt, _| prompt.contains("Take metformin twice daily"))
            .returning(|_, _| Ok(json!({"action_items": [1, 2.5, true]})));
        let (state, _) = mocks.build();

        let request = json_request(
            "POST",
            "/process-text",
            json!({"text": "Take metformin twice daily"}),
        );
        let (status, headers, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action_items"], json!(["1", "2.5", "true"]));
        assert_eq!(headers[DROPPED_KEY_TERMS_HEADER], "0");

        let session_id = headers[SESSION_ID_HEADER].to_str().unwrap();
        assert!(state.sessions.get(session_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_process_text_rejects_blank_text() {
        let (state, _) = Mocks::default().build();

        let request = json_request("POST", "/process-text", json!({"text": "   "}));
        let (status, _, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad request: text must not be empty");
    }
}
