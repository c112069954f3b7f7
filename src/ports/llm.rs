/// LLM service port trait
///
/// Defines the interface for hosted Large Language Model services.
/// Implementations: Google Gemini.
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name (e.g., "gemini-1.5-flash")
    pub model: String,

    /// Temperature for generation (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Maximum tokens in response
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: Some(0.3), // Lower temperature for more focused outputs
            max_tokens: Some(2048),
        }
    }
}

/// A model offered by a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub context_window: usize,
    /// Set when the provider did not report a limit and a known default was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fallback_context_window: Option<bool>,
}

/// Port trait for LLM services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmServicePort: Send + Sync {
    /// Send a prompt that asks for strict JSON and parse the reply
    ///
    /// The returned value is whatever the model produced; it still has to go
    /// through the normalizer.
    async fn generate_json(&self, prompt: &str, config: &LlmConfig) -> Result<serde_json::Value>;

    /// List the models this provider can generate with
    async fn fetch_available_models(&self) -> Result<Vec<ModelInfo>>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Check if the service is configured (has API key)
    fn is_configured(&self) -> bool;
}
