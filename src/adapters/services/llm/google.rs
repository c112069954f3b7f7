//! Gemini adapter
//!
//! Implements the LlmServicePort over the Generative Language REST API.
//! Replies are requested as `application/json`; the text of the first
//! candidate is then parsed, tolerating Markdown fences and stray prose.

use crate::error::{AppError, Result};
use crate::ports::llm::{LlmConfig, LlmServicePort, ModelInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const PREVIEW_CHARS: usize = 600;

/// Context windows for models whose listing omits `inputTokenLimit`
const KNOWN_CONTEXT_WINDOWS: &[(&str, usize)] = &[
    ("gemini-1.5-pro", 2_097_152),
    ("gemini-1.5-flash", 1_048_576),
];
const DEFAULT_CONTEXT_WINDOW: usize = 32_768;

/// Gemini over HTTPS with an API key
pub struct GoogleService {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleModel {
    name: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
    #[serde(rename = "inputTokenLimit")]
    input_token_limit: Option<u32>,
    #[serde(rename = "supportedGenerationMethods", default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleModelsResponse {
    #[serde(default)]
    models: Vec<GoogleModel>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}

impl GoogleService {
    /// Service against the public endpoint; an empty key leaves it unconfigured
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, GOOGLE_API_BASE.to_string())
    }

    /// Create a service talking to a different API root (proxies, tests)
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(90)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn list_models(&self) -> Result<Vec<GoogleModel>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Model listing request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "Model listing failed ({}): {}",
                status,
                preview(&body)
            )));
        }

        let listing: GoogleModelsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Unreadable model listing: {}", e)))?;

        Ok(listing
            .models
            .into_iter()
            .filter(GoogleModel::generates_content)
            .collect())
    }

    /// One `generateContent` round trip, returning the reply text
    async fn generate_text(&self, prompt: &str, config: &LlmConfig) -> Result<String> {
        if !self.is_configured() {
            return Err(AppError::Config("GEMINI_API_KEY not configured".to_string()));
        }

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
                response_mime_type: "application/json",
            }),
        };

        let model_name = Self::model_path(&config.model);
        log::info!("Requesting JSON from {}", model_name);

        let response = self
            .client
            .post(format!("{}/{}:generateContent", self.base_url, model_name))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("GenerateContent request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "GenerateContent failed ({}): {}",
                status,
                preview(&error_text)
            )));
        }

        let content_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse content response: {}", e)))?;

        let text = Self::first_candidate_text(content_response)?;
        log::info!("Gemini replied with {} characters", text.len());
        Ok(text)
    }

    /// `gemini-pro` -> `models/gemini-pro`; already-qualified names pass through
    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }

    fn first_candidate_text(response: GenerateContentResponse) -> Result<String> {
        if let Some(usage) = &response.usage_metadata {
            log::debug!("Gemini usage: {} tokens", usage.total_token_count);
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("No candidates returned".to_string()))?;

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let part = candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .ok_or_else(|| {
                AppError::Llm(format!(
                    "No content parts in response (finish reason: {})",
                    finish_reason
                ))
            })?;

        if finish_reason == "MAX_TOKENS" {
            log::warn!("Gemini reply was truncated at the token limit");
        }
        Ok(part.text)
    }
}

impl GoogleModel {
    fn generates_content(&self) -> bool {
        self.name.contains("gemini")
            && self
                .supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
    }

    /// Reported input limit, else a known figure; `true` marks the fallback
    fn context_window(&self, id: &str) -> (usize, bool) {
        match self.input_token_limit {
            Some(limit) => (limit as usize, false),
            None => {
                let known = KNOWN_CONTEXT_WINDOWS
                    .iter()
                    .find(|(prefix, _)| id.contains(prefix))
                    .map(|(_, window)| *window);
                (known.unwrap_or(DEFAULT_CONTEXT_WINDOW), true)
            }
        }
    }

    fn into_model_info(self) -> ModelInfo {
        let id = self
            .name
            .strip_prefix("models/")
            .unwrap_or(&self.name)
            .to_string();
        let (context_window, fallback) = self.context_window(&id);

        ModelInfo {
            name: if self.display_name.is_empty() {
                id.clone()
            } else {
                self.display_name
            },
            id,
            provider: "google".to_string(),
            context_window,
            is_fallback_context_window: fallback.then_some(true),
        }
    }
}

/// Strip Markdown code fences around a JSON reply
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner).trim();
    match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => inner[4..].trim(),
        _ => inner,
    }
}

/// Parse a model reply as JSON, tolerating fences and surrounding prose
pub fn parse_json_reply(text: &str) -> Result<serde_json::Value> {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            // Retry on the outermost object when the model wrapped it in prose
            let object = match (cleaned.find('{'), cleaned.rfind('}')) {
                (Some(start), Some(end)) if start < end => Some(&cleaned[start..=end]),
                _ => None,
            };
            object
                .and_then(|candidate| serde_json::from_str(candidate).ok())
                .ok_or_else(|| {
                    AppError::Llm(format!(
                        "Model did not return valid JSON: {}. Preview: {}",
                        first_error,
                        preview(cleaned)
                    ))
                })
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[async_trait]
impl LlmServicePort for GoogleService {
    async fn generate_json(&self, prompt: &str, config: &LlmConfig) -> Result<serde_json::Value> {
        let text = self.generate_text(prompt, config).await?;
        parse_json_reply(&text)
    }

    async fn fetch_available_models(&self) -> Result<Vec<ModelInfo>> {
        let models: Vec<ModelInfo> = self
            .list_models()
            .await?
            .into_iter()
            .map(GoogleModel::into_model_info)
            .collect();

        log::info!("Gemini offers {} content models", models.len());
        Ok(models)
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
