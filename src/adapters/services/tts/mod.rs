//! Text-to-speech adapters
//!
//! Implementations of the TtsServicePort:
//! - ElevenLabs

pub mod elevenlabs;

pub use elevenlabs::ElevenLabsService;
