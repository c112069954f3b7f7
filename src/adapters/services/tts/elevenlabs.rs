//! ElevenLabs text-to-speech adapter
//!
//! Implements the TtsServicePort; each call returns one MP3 clip.

use crate::config::ElevenLabsConfig;
use crate::error::{AppError, Result};
use crate::ports::tts::TtsServicePort;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1";
const AUDIO_MPEG: &str = "audio/mpeg";

/// ElevenLabs service implementation
pub struct ElevenLabsService {
    client: Client,
    api_key: String,
    default_voice_id: String,
    model_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
}

impl ElevenLabsService {
    /// Create a new ElevenLabs service from its configuration section
    pub fn new(config: &ElevenLabsConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().unwrap_or_default(),
            default_voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
        })
    }

    fn speech_url(&self, voice_id: Option<&str>) -> String {
        let voice = voice_id
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.default_voice_id);
        format!("{}/text-to-speech/{}", ELEVENLABS_API_BASE, voice.trim())
    }
}

#[async_trait]
impl TtsServicePort for ElevenLabsService {
    async fn synthesize(&self, text: &str, voice_id: Option<String>) -> Result<Vec<u8>> {
        if !self.is_configured() {
            return Err(AppError::Config("ELEVENLABS_API_KEY not configured".to_string()));
        }

        let url = self.speech_url(voice_id.as_deref());
        log::info!("Synthesizing {} characters of speech", text.len());

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", AUDIO_MPEG)
            .json(&SpeechRequest {
                text,
                model_id: self.model_id.as_deref(),
            })
            .send()
            .await
            .map_err(|e| AppError::Tts(format!("Speech request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Tts(format!(
                "Speech synthesis failed ({}): {}",
                status, error_text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| AppError::Tts(format!("Failed to read audio: {}", e)))?;

        log::debug!("Received {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }

    fn content_type(&self) -> &'static str {
        AUDIO_MPEG
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
