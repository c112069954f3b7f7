/// Text-to-speech service port trait
///
/// Implementations: ElevenLabs.
use crate::error::Result;
use async_trait::async_trait;

/// Port trait for speech synthesis
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TtsServicePort: Send + Sync {
    /// Synthesize one passage of text, returning encoded audio bytes
    ///
    /// `voice_id` overrides the adapter's default voice.
    async fn synthesize(&self, text: &str, voice_id: Option<String>) -> Result<Vec<u8>>;

    /// MIME type of the audio `synthesize` returns
    fn content_type(&self) -> &'static str;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Check if the service is configured (has API key)
    fn is_configured(&self) -> bool;
}
