//! External service adapters
//!
//! Adapters for the hosted APIs the pipeline talks to: OCR, LLM,
//! knowledge lookup, speech synthesis and token verification.

pub mod auth;
pub mod knowledge;
pub mod llm;
pub mod ocr;
pub mod tts;
