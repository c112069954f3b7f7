//! OCR service adapters
//!
//! Implementations of the OcrServicePort:
//! - Google Cloud Vision (DOCUMENT_TEXT_DETECTION)

pub mod google_vision;

pub use google_vision::GoogleVisionService;
