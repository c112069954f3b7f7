//! Document upload

use crate::commands::{ApiError, ApiResult, OptionalUser};
use crate::domain::models::{SessionRecord, UploadedDocument};
use crate::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

const FILE_FIELD: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Response describing the stored upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub size: usize,
}

/// POST /upload
///
/// Stores the multipart `file` field in a new session; `/process` reads it
/// from there.
pub async fn upload_document(
    State(state): State<AppState>,
    user: OptionalUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::bad_request)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(ApiError::bad_request)?;

        document = Some(UploadedDocument {
            file_name,
            mime_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let document = document.ok_or_else(|| ApiError::bad_request("missing `file` field"))?;
    if document.bytes.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    let file_name = document.file_name.clone();
    let content_type = document.mime_type.clone();
    let size = document.bytes.len();

    let mut record = SessionRecord::new("en").with_document(document);
    record.owner_uid = user.0;
    let session_id = record.session_id.clone();
    state
        .sessions
        .insert(record)
        .map_err(ApiError::processing)?;

    log::info!("Stored upload {} ({} bytes, {})", session_id, size, content_type);

    Ok(Json(UploadResponse {
        session_id,
        file_name,
        content_type,
        size,
    }))
}

#[cfg(test)]
mod tests {
    use crate::commands::test_support::*;
    use crate::domain::models::DocumentSource;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    const BOUNDARY: &str = "clarimed-boundary";

    fn multipart_request(field: &str, file_name: &str, content_type: &str, data: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_creates_session() {
        let (state, _) = Mocks::default().build();

        let request = multipart_request("file", "labs.pdf", "application/pdf", "%PDF-1.7 body");
        let (status, _, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["file_name"], "labs.pdf");
        assert_eq!(body["content_type"], "application/pdf");
        assert_eq!(body["size"], 13);

        let session_id = body["session_id"].as_str().unwrap();
        let record = state.sessions.get(session_id).unwrap().unwrap();
        let source = record.document_source().unwrap();
        assert!(matches!(source, DocumentSource::Inline { .. }));
        assert!(source.is_pdf());
    }

    #[tokio::test]
    async fn test_signed_in_upload_is_owned() {
        let (state, _) = Mocks::default().build();

        let request = with_token(
            multipart_request("file", "labs.pdf", "application/pdf", "%PDF-1.7"),
            "good-token",
        );
        let (status, _, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);

        let session_id = body["session_id"].as_str().unwrap();
        let record = state.sessions.get(session_id).unwrap().unwrap();
        assert_eq!(record.owner_uid.as_deref(), Some("uid-1"));
        assert!(!record.visible_to(None));
        assert!(record.visible_to(Some("uid-1")));
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let (state, _) = Mocks::default().build();

        let request = multipart_request("attachment", "labs.pdf", "application/pdf", "data");
        let (status, _, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad request: missing `file` field");
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let (mut state, _) = Mocks::default().build();
        state.max_upload_bytes = 64;

        let data = "x".repeat(256);
        let request = multipart_request("file", "big.png", "image/png", &data);
        let (status, _, _) = send(&state, request).await;

        assert!(status.is_client_error());
        assert_eq!(state.sessions.len().unwrap(), 0);
    }
}
