//! Google Cloud Vision OCR adapter
//!
//! Implements the OcrServicePort with DOCUMENT_TEXT_DETECTION.
//! API flow:
//! 1. Images go to `images:annotate` (inline base64 or `gs://` source)
//! 2. PDFs go to `files:annotate`, first pages only
//! 3. Page texts are joined with newlines

use crate::config::MAX_OCR_PAGES;
use crate::domain::models::DocumentSource;
use crate::error::{AppError, Result};
use crate::ports::ocr::OcrServicePort;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VISION_API_BASE: &str = "https://vision.googleapis.com/v1";
const FEATURE: &str = "DOCUMENT_TEXT_DETECTION";

/// Google Cloud Vision service implementation
pub struct GoogleVisionService {
    client: Client,
    api_key: String,
    base_url: String,
    max_pages: u32,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "gcsImageUri")]
    gcs_image_uri: String,
}

#[derive(Debug, Serialize)]
struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ImageSource>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: Image,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct BatchImageRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct GcsSource {
    uri: String,
}

#[derive(Debug, Serialize)]
struct InputConfig {
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(rename = "gcsSource", skip_serializing_if = "Option::is_none")]
    gcs_source: Option<GcsSource>,
}

#[derive(Debug, Serialize)]
struct FileRequest {
    #[serde(rename = "inputConfig")]
    input_config: InputConfig,
    features: Vec<Feature>,
    pages: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct BatchFileRequest {
    requests: Vec<FileRequest>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(rename = "fullTextAnnotation")]
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct BatchImageResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct BatchFileResponse {
    #[serde(default)]
    responses: Vec<FileResponse>,
}

impl GoogleVisionService {
    /// Create a new Vision service with the given API key
    pub fn new(api_key: String, max_pages: u32) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(180)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: VISION_API_BASE.to_string(),
            max_pages: max_pages.clamp(1, MAX_OCR_PAGES),
        })
    }

    fn image_request(source: &DocumentSource) -> BatchImageRequest {
        let image = match source {
            DocumentSource::Gcs { uri } => Image {
                content: None,
                source: Some(ImageSource {
                    gcs_image_uri: uri.clone(),
                }),
            },
            DocumentSource::Inline { bytes, .. } => Image {
                content: Some(BASE64.encode(bytes)),
                source: None,
            },
        };

        BatchImageRequest {
            requests: vec![ImageRequest {
                image,
                features: vec![Feature { kind: FEATURE }],
            }],
        }
    }

    fn file_request(&self, source: &DocumentSource) -> BatchFileRequest {
        let input_config = match source {
            DocumentSource::Gcs { uri } => InputConfig {
                mime_type: "application/pdf",
                content: None,
                gcs_source: Some(GcsSource { uri: uri.clone() }),
            },
            DocumentSource::Inline { bytes, .. } => InputConfig {
                mime_type: "application/pdf",
                content: Some(BASE64.encode(bytes)),
                gcs_source: None,
            },
        };

        BatchFileRequest {
            requests: vec![FileRequest {
                input_config,
                features: vec![Feature { kind: FEATURE }],
                pages: (1..=self.max_pages).collect(),
            }],
        }
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Ocr(format!("{} request failed: {}", endpoint, e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Ocr(format!("{} failed: {}", endpoint, error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Ocr(format!("Failed to parse {} response: {}", endpoint, e)))
    }

    fn image_text(response: ImageResponse) -> Result<String> {
        if let Some(error) = response.error.filter(|e| !e.message.is_empty()) {
            return Err(AppError::Ocr(error.message));
        }
        Ok(response
            .full_text_annotation
            .map(|a| a.text)
            .unwrap_or_default())
    }

    fn parse_image_response(batch: BatchImageResponse) -> Result<String> {
        match batch.responses.into_iter().next() {
            Some(response) => Self::image_text(response),
            None => Ok(String::new()),
        }
    }

    fn parse_file_response(batch: BatchFileResponse) -> Result<String> {
        let Some(file) = batch.responses.into_iter().next() else {
            return Ok(String::new());
        };
        if let Some(error) = file.error.filter(|e| !e.message.is_empty()) {
            return Err(AppError::Ocr(error.message));
        }

        let mut pages = Vec::new();
        for page in file.responses {
            let text = Self::image_text(page)?;
            if !text.is_empty() {
                pages.push(text);
            }
        }
        Ok(pages.join("\n"))
    }
}

#[async_trait]
impl OcrServicePort for GoogleVisionService {
    async fn extract_text(&self, source: &DocumentSource) -> Result<String> {
        if !self.is_configured() {
            return Err(AppError::Config(
                "GOOGLE_VISION_API_KEY not configured".to_string(),
            ));
        }

        log::info!("Running OCR on {}", source);

        let text = if source.is_pdf() {
            let batch: BatchFileResponse = self
                .post("files:annotate", &self.file_request(source))
                .await?;
            Self::parse_file_response(batch)?
        } else {
            let batch: BatchImageResponse = self
                .post("images:annotate", &Self::image_request(source))
                .await?;
            Self::parse_image_response(batch)?
        };

        log::info!("OCR extracted {} characters", text.len());
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "google-vision"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
