//! LLM service adapters
//!
//! Implementations of the LlmServicePort:
//! - Google (Gemini, JSON response mode)

pub mod google;

pub use google::GoogleService;
