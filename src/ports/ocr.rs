/// OCR service port trait
///
/// Defines the interface for document text extraction services.
/// Implementations: Google Cloud Vision.
use crate::domain::models::DocumentSource;
use crate::error::Result;
use async_trait::async_trait;

/// Port trait for OCR services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrServicePort: Send + Sync {
    /// Extract the full text of a document (empty when nothing was found)
    async fn extract_text(&self, source: &DocumentSource) -> Result<String>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Check if the service is configured (has API key)
    fn is_configured(&self) -> bool;
}
