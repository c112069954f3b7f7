/// Port trait definitions (interfaces)
///
/// These traits define the contracts for adapters to implement.
/// Following the ports-and-adapters (hexagonal) architecture pattern.
pub mod auth;
pub mod knowledge;
pub mod llm;
pub mod ocr;
pub mod storage;
pub mod tts;

#[cfg(test)]
pub mod mocks;

pub use auth::AuthPort;
pub use knowledge::KnowledgePort;
pub use llm::{LlmConfig, LlmServicePort, ModelInfo};
pub use ocr::OcrServicePort;
pub use storage::StoragePort;
pub use tts::TtsServicePort;
